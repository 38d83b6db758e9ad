use std::ffi::{CStr, CString};

use libc::{c_int, c_uint, close, dup2, open, STDIN_FILENO, STDOUT_FILENO};

use crate::error::{errno, ChildError, ParseError};
use crate::parser::ArgumentList;

pub(crate) const INPUT_OPERATOR: char = '<';
pub(crate) const OUTPUT_OPERATOR: char = '>';

// rw-r--r--
const OUTPUT_MODE: c_uint = 0o644;

/// At most one file for standard input and one for standard output.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct RedirectionSpec {
    pub(crate) input: Option<String>,
    pub(crate) output: Option<String>,
}

impl RedirectionSpec {
    /// Converts the file names up front so the child does not have to.
    pub(crate) fn to_targets(&self) -> Result<Targets, ParseError> {
        let convert = |path: &Option<String>| {
            path.as_deref()
                .map(CString::new)
                .transpose()
                .map_err(|_| ParseError::NulByte)
        };

        Ok(Targets {
            input: convert(&self.input)?,
            output: convert(&self.output)?,
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct Targets {
    input: Option<CString>,
    output: Option<CString>,
}

fn operator(arg: &str) -> Option<char> {
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c == INPUT_OPERATOR || c == OUTPUT_OPERATOR => Some(c),
        _ => None,
    }
}

/// Pulls the first `<` and the first `>` together with the file name that
/// follows each out of `args`.
///
/// Operators are recognised left to right, so a token taken as a file name
/// is never an operator itself. Later occurrences of an operator stay in the
/// list as ordinary arguments.
pub(crate) fn extract(args: ArgumentList) -> Result<(ArgumentList, RedirectionSpec), ParseError> {
    let mut remaining = Vec::with_capacity(args.len());
    let mut spec = RedirectionSpec::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (slot, op) = match operator(&arg) {
            Some(op) if op == INPUT_OPERATOR && spec.input.is_none() => (&mut spec.input, op),
            Some(op) if op == OUTPUT_OPERATOR && spec.output.is_none() => (&mut spec.output, op),
            _ => {
                remaining.push(arg);
                continue;
            }
        };

        *slot = Some(args.next().ok_or(ParseError::MissingRedirectTarget(op))?);
    }

    Ok((remaining, spec))
}

fn redirect(path: &CStr, flags: c_int, target_fd: c_int) -> Result<(), RedirectFailure> {
    let fd = unsafe { open(path.as_ptr(), flags, OUTPUT_MODE) };
    if fd == -1 {
        return Err(RedirectFailure::Open(errno()));
    }

    if fd != target_fd {
        let result = unsafe { dup2(fd, target_fd) };
        let dup_errno = errno();
        unsafe { close(fd) };
        if result == -1 {
            return Err(RedirectFailure::Duplicate(dup_errno));
        }
    }

    Ok(())
}

enum RedirectFailure {
    Open(c_int),
    Duplicate(c_int),
}

/// Rewires standard input and output of the calling process. Only ever
/// called in a freshly forked child, so it does not allocate.
pub(crate) fn apply(targets: &Targets) -> Result<(), ChildError> {
    if let Some(path) = &targets.input {
        redirect(path, libc::O_RDONLY, STDIN_FILENO).map_err(|failure| match failure {
            RedirectFailure::Open(error_num) => ChildError::OpenInput(error_num),
            RedirectFailure::Duplicate(error_num) => ChildError::Duplicate(error_num),
        })?;
    }

    if let Some(path) = &targets.output {
        redirect(
            path,
            libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            STDOUT_FILENO,
        )
        .map_err(|failure| match failure {
            RedirectFailure::Open(error_num) => ChildError::OpenOutput(error_num),
            RedirectFailure::Duplicate(error_num) => ChildError::Duplicate(error_num),
        })?;
    }

    Ok(())
}
