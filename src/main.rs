mod builtin;
mod config;
mod error;
mod execution;
mod parser;
mod redirect;
mod repl;
mod shell;

use std::io;
use std::process;

use log::{debug, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use crate::config::Config;
use crate::error::FatalError;
use crate::repl::{EditorSource, ReaderSource};
use crate::shell::Shell;

pub(crate) const NAME: &str = "tinysh";

fn init_logging(level: LevelFilter) {
    // fails only when a logger is already installed
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn run() -> Result<(), FatalError> {
    let config = Config::from_env()?;
    init_logging(config.log_level);
    debug!("starting with {:?}", config);

    let mut shell = Shell::new(config)?;

    if unsafe { libc::isatty(libc::STDIN_FILENO) } == 1 {
        let mut source = EditorSource::new()?;
        println!(
            "Welcome to {}.\nType 'help' for a list of commands.\nType 'exit' to quit.",
            NAME
        );
        repl::run(&mut shell, &mut source)?;
        println!("{} exited. Thank you!", NAME);
    } else {
        let stdin = io::stdin();
        repl::run(&mut shell, &mut ReaderSource::new(stdin.lock()))?;
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}: {}", NAME, err);
        process::exit(1);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard};

    use lazy_static::lazy_static;

    lazy_static! {
        static ref PROCESS_STATE: Mutex<()> = Mutex::new(());
    }

    /// Serialises tests that change the working directory or `HOME`.
    pub(crate) fn lock_process_state() -> MutexGuard<'static, ()> {
        PROCESS_STATE
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
