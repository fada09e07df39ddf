//! Console input collaborator.
//!
//! Supplies an already-trimmed, non-empty line of text as the outgoing
//! message. Empty input is rejected here, before it can reach the
//! exchange layer.

use std::io::{self, BufRead, Write};

use crate::error::ExchangeError;

/// Prompt written before reading a message from stdin.
pub const DEFAULT_PROMPT: &str = "Enter your message: ";

/// Read one line from `reader`, trim surrounding whitespace and the
/// newline, and reject the result if nothing remains.
pub fn read_message<R: BufRead>(mut reader: R) -> Result<String, ExchangeError> {
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let message = line.trim();
    if message.is_empty() {
        return Err(ExchangeError::EmptyInput);
    }

    Ok(message.to_string())
}

/// Print `prompt`, then read a trimmed, non-empty message from stdin.
pub fn prompt_message(prompt: &str) -> Result<String, ExchangeError> {
    print!("{prompt}");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let locked = stdin.lock();
    read_message(locked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace_and_newline() {
        let message = read_message("  Hello, QUIC server!  \n".as_bytes()).unwrap();
        assert_eq!(message, "Hello, QUIC server!");
    }

    #[test]
    fn rejects_empty_line() {
        let err = read_message("\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ExchangeError::EmptyInput));
    }

    #[test]
    fn rejects_whitespace_only_line() {
        let err = read_message("   \t  \n".as_bytes()).unwrap_err();
        assert!(matches!(err, ExchangeError::EmptyInput));
    }

    #[test]
    fn accepts_line_without_trailing_newline() {
        let message = read_message("ping".as_bytes()).unwrap();
        assert_eq!(message, "ping");
    }
}
