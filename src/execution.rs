use std::ffi::{CStr, CString};
use std::io::{self, Write};
use std::iter::once;
use std::ptr::null;

use libc::{c_char, c_int, c_void, execvp, fork, pid_t, strerror, waitpid, EINTR, STDERR_FILENO};
use log::{debug, warn};

use crate::error::{describe, errno, ChildError, FatalError, ParseError};
use crate::parser::ArgumentList;
use crate::redirect::{self, RedirectionSpec, Targets};

/// Message prefixes for the child, one per kind of [`ChildError`]. The
/// reason from `strerror` and a newline are appended when written.
#[derive(Debug)]
struct Diagnostics {
    open_input: Vec<u8>,
    open_output: Vec<u8>,
    duplicate: Vec<u8>,
    exec: Vec<u8>,
}

impl Diagnostics {
    fn new(program: &str, redirections: &RedirectionSpec) -> Self {
        let prefix = |message: String| format!("{}: {}: ", crate::NAME, message).into_bytes();

        Diagnostics {
            open_input: prefix(format!(
                "failed to open file for reading: {}",
                redirections.input.as_deref().unwrap_or_default()
            )),
            open_output: prefix(format!(
                "failed to open file for writing: {}",
                redirections.output.as_deref().unwrap_or_default()
            )),
            duplicate: prefix("redirection failed".to_string()),
            exec: prefix(format!("execution failed: {}", program)),
        }
    }

    fn prefix(&self, error: &ChildError) -> &[u8] {
        match error {
            ChildError::OpenInput(_) => &self.open_input,
            ChildError::OpenOutput(_) => &self.open_output,
            ChildError::Duplicate(_) => &self.duplicate,
            ChildError::Exec(_) => &self.exec,
        }
    }
}

/// An external command ready to be forked: argument strings, redirection
/// targets and the child's error messages are prepared for the system calls.
#[derive(Debug)]
pub(crate) struct Invocation {
    argv: Vec<CString>,
    targets: Targets,
    diagnostics: Diagnostics,
}

impl Invocation {
    pub(crate) fn new(args: ArgumentList, redirections: &RedirectionSpec) -> Result<Self, ParseError> {
        if args.is_empty() {
            return Err(ParseError::MissingCommand);
        }

        let diagnostics = Diagnostics::new(&args[0], redirections);
        let argv = args
            .into_iter()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseError::NulByte)?;

        Ok(Invocation {
            argv,
            targets: redirections.to_targets()?,
            diagnostics,
        })
    }

    fn program(&self) -> String {
        self.argv[0].to_string_lossy().into_owned()
    }
}

fn log_status(pid: pid_t, status: c_int) {
    if libc::WIFEXITED(status) {
        debug!("child {} exited with status {}", pid, libc::WEXITSTATUS(status));
    } else if libc::WIFSIGNALED(status) {
        debug!("child {} killed by signal {}", pid, libc::WTERMSIG(status));
    }
}

fn wait_foreground(pid: pid_t) {
    let mut status: c_int = 0;

    loop {
        if unsafe { waitpid(pid, &mut status, 0) } != -1 {
            log_status(pid, status);
            return;
        }

        match errno() {
            EINTR => continue,
            error_num => {
                warn!("waitpid for child {} failed: {}", pid, describe(error_num));
                return;
            }
        }
    }
}

// Only raw writes here: a forked child must not allocate or take locks
// another thread of the parent may have held.
fn write_stderr(bytes: &[u8]) {
    unsafe { libc::write(STDERR_FILENO, bytes.as_ptr() as *const c_void, bytes.len()) };
}

fn run_child(invocation: &Invocation, argv: &[*const c_char]) -> ! {
    let error = match redirect::apply(&invocation.targets) {
        Ok(()) => {
            unsafe { execvp(argv[0], argv.as_ptr()) };
            ChildError::Exec(errno())
        }
        Err(error) => error,
    };

    write_stderr(invocation.diagnostics.prefix(&error));
    write_stderr(unsafe { CStr::from_ptr(strerror(error.error_num())) }.to_bytes());
    write_stderr(b"\n");
    unsafe { libc::_exit(1) }
}

/// Runs `invocation` in a child process and blocks until it terminates.
///
/// The child's exit status is only logged. Everything that goes wrong inside
/// the child stays there; the only error returned is a failed fork.
pub(crate) fn execute(invocation: &Invocation) -> Result<(), FatalError> {
    let argv: Vec<*const c_char> = invocation
        .argv
        .iter()
        .map(|arg| arg.as_ptr())
        .chain(once(null()))
        .collect();

    // anything still buffered would otherwise show up after the child's output
    let _ = io::stdout().flush();

    let pid = unsafe { fork() };
    match pid {
        -1 => Err(FatalError::Fork(errno())),
        0 => run_child(invocation, &argv),
        _ => {
            debug!(
                "started {:?} as child {} with {:?}",
                invocation.program(),
                pid,
                invocation.targets
            );
            wait_foreground(pid);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;

    use super::Invocation;
    use crate::error::{ChildError, ParseError};
    use crate::redirect::{self, RedirectionSpec};
    use crate::test_support::lock_process_state;

    fn invocation(line: &str) -> Result<Invocation, ParseError> {
        let args = crate::parser::tokenize(line, 63)?;
        let (args, redirections) = redirect::extract(args)?;
        Invocation::new(args, &redirections)
    }

    #[test]
    fn test_invocation_requires_command() {
        assert_eq!(
            Invocation::new(vec![], &RedirectionSpec::default()).err(),
            Some(ParseError::MissingCommand)
        );
        assert_eq!(
            invocation("> out.txt").err(),
            Some(ParseError::MissingCommand)
        );
    }

    #[test]
    fn test_child_messages_prepared_before_fork() -> Result<(), ParseError> {
        let invocation = invocation("sort < in.txt > out.txt")?;
        let diagnostics = &invocation.diagnostics;

        assert_eq!(
            diagnostics.prefix(&ChildError::OpenInput(libc::ENOENT)),
            &b"tinysh: failed to open file for reading: in.txt: "[..]
        );
        assert_eq!(
            diagnostics.prefix(&ChildError::OpenOutput(libc::EACCES)),
            &b"tinysh: failed to open file for writing: out.txt: "[..]
        );
        assert_eq!(
            diagnostics.prefix(&ChildError::Exec(libc::ENOENT)),
            &b"tinysh: execution failed: sort: "[..]
        );
        Ok(())
    }

    #[test]
    fn test_invocation_rejects_nul() {
        assert_eq!(
            Invocation::new(
                vec!["echo".to_string(), "a\0".to_string()],
                &RedirectionSpec::default()
            )
            .err(),
            Some(ParseError::NulByte)
        );
    }

    #[test]
    fn test_execute_output_redirection() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out.txt");

        super::execute(&invocation(&format!("echo hi > \"{}\"", out.display()))?)?;

        assert_eq!(fs::read_to_string(&out)?, "hi\n");
        Ok(())
    }

    #[test]
    fn test_execute_output_truncates() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out.txt");
        fs::write(&out, "a much longer previous content\n")?;

        super::execute(&invocation(&format!("echo short > {}", out.display()))?)?;

        assert_eq!(fs::read_to_string(&out)?, "short\n");
        Ok(())
    }

    #[test]
    fn test_execute_input_and_output_redirection() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.txt");
        let out = dir.path().join("count.txt");
        fs::write(&input, "one\ntwo\nthree\n")?;

        super::execute(&invocation(&format!(
            "wc -l < {} > {}",
            input.display(),
            out.display()
        ))?)?;

        assert_eq!(fs::read_to_string(&out)?.trim(), "3");
        Ok(())
    }

    #[test]
    fn test_execute_missing_input_leaves_parent_alone() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out.txt");

        super::execute(&invocation(&format!(
            "cat < {} > {}",
            dir.path().join("missing.txt").display(),
            out.display()
        ))?)?;

        // the child gave up before opening the output file
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn test_execute_unknown_program() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out.txt");

        let result = super::execute(&invocation(&format!(
            "tinysh-no-such-program-here > {}",
            out.display()
        ))?);

        assert_eq!(result, Ok(()));
        // redirection happens before the program is looked up
        assert_eq!(fs::read_to_string(&out)?, "");
        Ok(())
    }

    #[test]
    fn test_execute_leaves_working_directory() -> Result<(), Box<dyn std::error::Error>> {
        let _guard = lock_process_state();
        let before = env::current_dir()?;

        super::execute(&invocation("true")?)?;

        assert_eq!(env::current_dir()?, before);
        Ok(())
    }
}
