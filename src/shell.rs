use std::env;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::builtin;
use crate::config::Config;
use crate::error::FatalError;
use crate::execution::{self, Invocation};
use crate::parser::{tokenize, ArgumentList};
use crate::redirect;

/// What a line asks for, decided once from its first argument.
#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    Exit,
    ChangeDirectory(Option<String>),
    Help,
    External(ArgumentList),
}

/// Returns `None` for an empty argument list.
pub(crate) fn resolve(args: ArgumentList) -> Option<Command> {
    match args.first()?.as_str() {
        "exit" => return Some(Command::Exit),
        "cd" => return Some(Command::ChangeDirectory(args.get(1).cloned())),
        "help" => return Some(Command::Help),
        _ => {}
    }

    Some(Command::External(args))
}

#[derive(Debug, PartialEq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

pub(crate) fn report(error: &dyn Error) {
    eprintln!("{}: {}", crate::NAME, error);
}

/// Interpreter state that outlives a single line.
pub(crate) struct Shell {
    config: Config,
    cwd: PathBuf,
}

impl Shell {
    pub(crate) fn new(config: Config) -> Result<Self, FatalError> {
        Ok(Shell {
            config,
            cwd: current_dir()?,
        })
    }

    pub(crate) fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub(crate) fn prompt(&self) -> String {
        format!("{}> ", self.cwd().display())
    }

    /// Re-reads the working directory of the process.
    pub(crate) fn refresh_cwd(&mut self) -> Result<(), FatalError> {
        self.cwd = current_dir()?;
        Ok(())
    }

    /// Parses and runs one line.
    ///
    /// Problems with the line itself or with a built-in are reported and
    /// the shell carries on; only a [`FatalError`] is handed back.
    pub(crate) fn dispatch(&mut self, line: &str) -> Result<Flow, FatalError> {
        let args = match tokenize(line, self.config.max_args) {
            Ok(args) => args,
            Err(err) => {
                report(&err);
                return Ok(Flow::Continue);
            }
        };

        let command = match resolve(args) {
            Some(command) => command,
            None => return Ok(Flow::Continue),
        };
        debug!("resolved {:?}", command);

        match command {
            Command::Exit => return Ok(Flow::Exit),
            Command::ChangeDirectory(target) => {
                if let Err(err) = builtin::change_directory(target.as_deref()) {
                    report(&err);
                }
                self.refresh_cwd()?;
            }
            Command::Help => {
                if let Err(err) = builtin::help(&mut io::stdout()) {
                    warn!("cannot write help text: {}", err);
                }
            }
            Command::External(args) => self.run_external(args)?,
        }

        Ok(Flow::Continue)
    }

    fn run_external(&self, args: ArgumentList) -> Result<(), FatalError> {
        let invocation = redirect::extract(args)
            .and_then(|(args, redirections)| Invocation::new(args, &redirections));

        match invocation {
            Ok(invocation) => execution::execute(&invocation),
            Err(err) => {
                report(&err);
                Ok(())
            }
        }
    }
}

fn current_dir() -> Result<PathBuf, FatalError> {
    env::current_dir().map_err(|err| FatalError::WorkingDirectory(err.raw_os_error().unwrap_or(0)))
}
