use std::io::{self, BufRead};

use log::warn;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::{FatalError, ParseError};
use crate::shell::{report, Flow, Shell};

#[derive(Debug, PartialEq)]
pub(crate) enum Input {
    Line(String),
    /// A line that was read but cannot be used; the loop reports it and
    /// moves on.
    Rejected(ParseError),
    Interrupted,
    Eof,
}

/// Where the loop gets its lines from.
pub(crate) trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Input, FatalError>;
}

/// Terminal input with line editing and in-memory history.
pub(crate) struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub(crate) fn new() -> Result<Self, FatalError> {
        let editor = DefaultEditor::new().map_err(|err| FatalError::Input(err.to_string()))?;
        Ok(EditorSource { editor })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<Input, FatalError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        warn!("cannot add history entry: {}", err);
                    }
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(ReadlineError::Io(ref err)) if err.kind() == io::ErrorKind::InvalidData => Ok(Input::Rejected(ParseError::InvalidUtf8)),
            Err(err) => Err(FatalError::Input(err.to_string())),
        }
    }
}

/// Plain line reader for piped input; the prompt is never shown.
pub(crate) struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub(crate) fn new(reader: R) -> Self {
        ReaderSource { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<Input, FatalError> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => Ok(Input::Eof),
            Ok(_) => {
                if line.ends_with(b"\n") {
                    line.pop();
                    if line.ends_with(b"\r") {
                        line.pop();
                    }
                }
                match String::from_utf8(line) {
                    Ok(line) => Ok(Input::Line(line)),
                    Err(_) => Ok(Input::Rejected(ParseError::InvalidUtf8)),
                }
            }
            Err(err) => Err(FatalError::Input(err.to_string())),
        }
    }
}

/// Feeds lines to `shell` until `exit` or end of input.
pub(crate) fn run(shell: &mut Shell, source: &mut dyn LineSource) -> Result<(), FatalError> {
    loop {
        shell.refresh_cwd()?;

        match source.read_line(&shell.prompt())? {
            Input::Line(line) => {
                if shell.dispatch(&line)? == Flow::Exit {
                    return Ok(());
                }
            }
            Input::Rejected(err) => report(&err),
            Input::Interrupted => continue,
            Input::Eof => return Ok(()),
        }
    }
}
