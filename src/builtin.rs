use std::env;
use std::io::{self, Write};

use crate::error::BuiltinError;
use crate::redirect::{INPUT_OPERATOR, OUTPUT_OPERATOR};

/// Changes the working directory of the interpreter, and with it of every
/// child started afterwards. Without a target `HOME` is used.
pub(crate) fn change_directory(target: Option<&str>) -> Result<(), BuiltinError> {
    let target = match target {
        Some(target) => target.into(),
        None => env::var_os("HOME").ok_or(BuiltinError::HomeNotSet)?,
    };

    env::set_current_dir(&target).map_err(|err| BuiltinError::ChangeDirectory {
        target: target.to_string_lossy().into_owned(),
        error_num: err.raw_os_error().unwrap_or(0),
    })
}

pub(crate) fn help(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{} - Help Menu", crate::NAME)?;
    writeln!(out, "The following commands are supported:")?;
    writeln!(out, "  help        : Display this help menu.")?;
    writeln!(out, "  cd <dir>    : Change the current directory to <dir> ($HOME if omitted).")?;
    writeln!(out, "  exit        : Exit the shell.")?;
    writeln!(out, "  <command>   : Execute external commands (e.g., ls, ./fact).")?;
    writeln!(out, "  I/O Redirection:")?;
    writeln!(out, "     Use '{}' to redirect output to a file.", OUTPUT_OPERATOR)?;
    writeln!(out, "     Use '{}' to redirect input from a file.", INPUT_OPERATOR)?;
    writeln!(out)
}
