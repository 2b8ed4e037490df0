//! Human moves read from standard input.

use set_game::{SeatId, SlotIndex};
use std::num::ParseIntError;

/// One line typed by a human player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle { seat: SeatId, slot: SlotIndex },
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Expected `<seat> <slot>` or `q`")]
    Malformed,

    #[error("Not a number: {0}")]
    NotANumber(#[from] ParseIntError),
}

/// Parse a line of the form `<seat> <slot>`, or `q`/`quit`.
/// Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Result<Command, InputError>> {
    let mut words = line.split_whitespace();
    let first = words.next()?;

    if matches!(first, "q" | "quit") {
        return Some(Ok(Command::Quit));
    }

    let command = match (words.next(), words.next()) {
        (Some(slot), None) => parse_toggle(first, slot),
        _ => Err(InputError::Malformed),
    };
    Some(command)
}

fn parse_toggle(seat: &str, slot: &str) -> Result<Command, InputError> {
    Ok(Command::Toggle {
        seat: seat.parse()?,
        slot: slot.parse()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        assert_eq!(
            parse_command("1 7"),
            Some(Ok(Command::Toggle { seat: 1, slot: 7 }))
        );
        assert_eq!(
            parse_command("  0\t11 "),
            Some(Ok(Command::Toggle { seat: 0, slot: 11 }))
        );
    }

    #[test]
    fn test_quit_and_blank() {
        assert_eq!(parse_command("q"), Some(Ok(Command::Quit)));
        assert_eq!(parse_command("quit"), Some(Ok(Command::Quit)));
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_command("3"), Some(Err(InputError::Malformed)));
        assert_eq!(parse_command("1 2 3"), Some(Err(InputError::Malformed)));
        assert!(matches!(
            parse_command("a 2"),
            Some(Err(InputError::NotANumber(_)))
        ));
    }
}
