//! Line-oriented Console
//!
//! The session reads one line per prompt and writes plain text lines.
//! [`Console`] is the seam between the session and the terminal: the binary
//! uses stdin/stdout, tests drive it from an in-memory script.

use std::io::{self, BufRead, Write};

use crate::error::{CirculateError, Result};

/// Source of input lines and sink for output lines
pub trait Console {
    /// Write one line
    fn say(&mut self, line: &str) -> Result<()>;

    /// Read one line without its terminator, `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Write several lines
    fn say_all<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.say(line.as_ref())?;
        }
        Ok(())
    }

    /// Print a prompt and read the answer; end of input is an error
    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.say(prompt)?;
        self.read_line()?
            .ok_or_else(|| CirculateError::console_error(format!("Input ended at prompt '{prompt}'")))
    }
}

/// [`Console`] over any buffered reader and writer
pub struct LineConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConsole<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the writer (captured output in tests)
    pub fn into_output(self) -> W {
        self.output
    }
}

impl LineConsole<io::StdinLock<'static>, io::Stdout> {
    /// Console on the process's stdin and stdout
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console for LineConsole<R, W> {
    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}")?;
        self.output.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }

        let trimmed_len = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed_len);
        Ok(Some(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_read_lines_until_eof() {
        let mut console = LineConsole::new(Cursor::new("first\r\nsecond\n\nlast"), Vec::new());

        assert_eq!(console.read_line().unwrap().as_deref(), Some("first"));
        assert_eq!(console.read_line().unwrap().as_deref(), Some("second"));
        assert_eq!(console.read_line().unwrap().as_deref(), Some(""));
        assert_eq!(console.read_line().unwrap().as_deref(), Some("last"));
        assert_eq!(console.read_line().unwrap(), None);
    }

    #[test]
    fn test_ask_prints_prompt() {
        let mut console = LineConsole::new(Cursor::new("Jane\n"), Vec::new());

        assert_eq!(console.ask("Enter author's first name:").unwrap(), "Jane");
        let err = console.ask("Enter author's last name:").unwrap_err();
        assert_eq!(err.error_code(), "CONSOLE_ERROR");

        let output = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(output, "Enter author's first name:\nEnter author's last name:\n");
    }

    #[test]
    fn test_say_all() {
        let mut console = LineConsole::new(Cursor::new(""), Vec::new());
        console.say_all(["a", "b"]).unwrap();
        assert_eq!(String::from_utf8(console.into_output()).unwrap(), "a\nb\n");
    }
}
