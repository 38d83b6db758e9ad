use std::error::Error;
use std::ffi::CStr;
use std::fmt;

use libc::{__errno_location, c_int, strerror};

pub(crate) fn errno() -> c_int {
    unsafe { *__errno_location() }
}

pub(crate) fn describe(error_num: c_int) -> String {
    unsafe { CStr::from_ptr(strerror(error_num)) }
        .to_string_lossy()
        .into_owned()
}

/// A line that cannot be turned into a runnable command.
#[derive(Debug, PartialEq)]
pub enum ParseError {
    MismatchedQuote,
    TooManyArguments { limit: usize },
    MissingRedirectTarget(char),
    MissingCommand,
    NulByte,
    InvalidUtf8,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MismatchedQuote => write!(f, "mismatched quotes"),
            ParseError::TooManyArguments { limit } => {
                write!(f, "too many arguments (at most {} allowed)", limit)
            }
            ParseError::MissingRedirectTarget(op) => {
                write!(f, "missing file name after '{}'", op)
            }
            ParseError::MissingCommand => write!(f, "missing command before redirection"),
            ParseError::NulByte => write!(f, "argument contains a NUL byte"),
            ParseError::InvalidUtf8 => write!(f, "input line is not valid UTF-8"),
        }
    }
}

impl Error for ParseError {}

#[derive(Debug, PartialEq)]
pub enum BuiltinError {
    HomeNotSet,
    ChangeDirectory { target: String, error_num: c_int },
}

impl fmt::Display for BuiltinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuiltinError::HomeNotSet => write!(f, "cd failed: HOME not set"),
            BuiltinError::ChangeDirectory { target, error_num } => {
                write!(f, "cd failed: {}: {}", target, describe(*error_num))
            }
        }
    }
}

impl Error for BuiltinError {}

/// Failures inside a forked child. They hold no heap data, the child
/// reports them with text prepared before the fork and exits.
#[derive(Debug, PartialEq)]
pub enum ChildError {
    OpenInput(c_int),
    OpenOutput(c_int),
    Duplicate(c_int),
    Exec(c_int),
}

impl ChildError {
    pub(crate) fn error_num(&self) -> c_int {
        match self {
            ChildError::OpenInput(error_num)
            | ChildError::OpenOutput(error_num)
            | ChildError::Duplicate(error_num)
            | ChildError::Exec(error_num) => *error_num,
        }
    }
}

/// Errors that end the interpreter with exit status 1.
#[derive(Debug, PartialEq)]
pub enum FatalError {
    Fork(c_int),
    WorkingDirectory(c_int),
    Config(String),
    Input(String),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::Fork(error_num) => write!(f, "fork failed: {}", describe(*error_num)),
            FatalError::WorkingDirectory(error_num) => {
                write!(f, "getcwd failed: {}", describe(*error_num))
            }
            FatalError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            FatalError::Input(msg) => write!(f, "cannot read input: {}", msg),
        }
    }
}

impl Error for FatalError {}
