//! Interactive terminal access.
//!
//! Everything the program asks the user goes through [`Console`], which keeps
//! the authentication flow testable without a terminal.

use std::io::{self, BufRead, Write};

#[cfg_attr(test, mockall::automock)]
pub trait Console: Send + Sync {
    /// Shows `message` and returns the line typed in reply, trimmed.
    fn prompt(&self, message: &str) -> io::Result<String>;

    /// Neutral status line.
    fn info(&self, message: &str);

    /// Something went wrong but the run continues.
    fn warn(&self, message: &str);

    /// Something went wrong and the run stops.
    fn error(&self, message: &str);
}

/// The real terminal: prompts on stdout, answers from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Console for Terminal {
    fn prompt(&self, message: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "\x1b[1m{message}\x1b[0m ")?;
        stdout.flush()?;

        let mut input = String::new();
        let read = io::stdin().lock().read_line(&mut input)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "standard input closed while waiting for an answer",
            ));
        }

        Ok(input.trim().to_string())
    }

    fn info(&self, message: &str) {
        println!("\x1b[34m{message}\x1b[0m");
    }

    fn warn(&self, message: &str) {
        println!("\x1b[33m{message}\x1b[0m");
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[1m\x1b[31m{message}\x1b[0m");
    }
}
