//! Styled terminal output for the CLI.
//!
//! Every user-facing line follows the same shape: a right-aligned action
//! column followed by the message details, styled with crossterm. Errors
//! go to stderr, everything else to stdout. Styling is dropped when the
//! target stream is not a terminal so piped output stays plain.

use std::io::{stderr, stdout, IsTerminal, Result as IoResult, Write};

use crossterm::{
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};

/// Width of the action column in terminal output
pub const ACTION_WIDTH: usize = 15;

/// How a message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Error,
    Highlight,
}

impl MessageType {
    fn color(&self) -> Color {
        match self {
            MessageType::Info => Color::Cyan,
            MessageType::Success | MessageType::Highlight => Color::Green,
            MessageType::Error => Color::Red,
        }
    }

    fn bold(&self) -> bool {
        matches!(self, MessageType::Error | MessageType::Highlight)
    }
}

/// One line of CLI output: a short action label plus the details.
#[derive(Debug, Clone)]
pub struct Message {
    pub action: String,
    pub details: String,
}

impl Message {
    pub fn new(action: String, details: String) -> Message {
        Message { action, details }
    }
}

/// Internal helper that writes one message to any writer. This allows for
/// testing by capturing output to a buffer.
fn write_message_to<W: Write>(
    writer: &mut W,
    message_type: MessageType,
    message: &Message,
    no_ansi: bool,
) -> IoResult<()> {
    // Character-aware truncation to avoid panics on multi-byte UTF-8
    let truncated_action = if message.action.chars().count() > ACTION_WIDTH {
        message
            .action
            .chars()
            .take(ACTION_WIDTH)
            .collect::<String>()
    } else {
        message.action.clone()
    };
    let padded_action = format!("{truncated_action:>ACTION_WIDTH$}");

    if !no_ansi {
        execute!(writer, SetForegroundColor(message_type.color()))?;
        if message_type.bold() {
            execute!(writer, SetAttribute(Attribute::Bold))?;
        }
    }

    execute!(writer, Print(&padded_action))?;

    if !no_ansi {
        execute!(writer, ResetColor)?;
        if message_type.bold() {
            execute!(writer, SetAttribute(Attribute::Reset))?;
        }
    }

    execute!(writer, Print(" "), Print(&message.details), Print("\n"))?;

    Ok(())
}

/// Routes a message to the right stream. Write failures end up in the log
/// rather than aborting the command. Use the `show_message!` macro instead
/// of calling this directly.
pub fn show_message_wrapper(message_type: MessageType, message: Message) {
    let result = if message_type == MessageType::Error {
        let mut stream = stderr();
        let no_ansi = !stream.is_terminal();
        write_message_to(&mut stream, message_type, &message, no_ansi)
    } else {
        let mut stream = stdout();
        let no_ansi = !stream.is_terminal();
        write_message_to(&mut stream, message_type, &message, no_ansi)
    };
    if let Err(e) = result {
        log::error!("Failed to write message to terminal: {e}");
    }
}

#[macro_export]
macro_rules! show_message {
    ($message_type:expr, $message:expr) => {
        $crate::cli::display::show_message_wrapper($message_type, $message)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(message_type: MessageType, action: &str, details: &str, no_ansi: bool) -> String {
        let mut buffer = Vec::new();
        let message = Message::new(action.to_string(), details.to_string());
        write_message_to(&mut buffer, message_type, &message, no_ansi).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn action_column_is_right_aligned() {
        let output = render(MessageType::Info, "Check", "all good", true);

        assert_eq!(output, format!("{:>15} all good\n", "Check"));
    }

    #[test]
    fn long_actions_are_truncated_to_the_column_width() {
        let output = render(MessageType::Info, "AVeryLongActionLabel", "details", true);

        let action_column = &output[..ACTION_WIDTH];
        assert_eq!(action_column, "AVeryLongAction");
    }

    #[test]
    fn multi_byte_actions_do_not_panic() {
        let output = render(MessageType::Success, "Prüfung läuft gut", "ok", true);

        assert!(output.contains("ok"));
    }

    #[test]
    fn ansi_codes_present_when_enabled() {
        let output = render(MessageType::Error, "Check", "boom", false);

        assert!(
            output.contains("\x1b["),
            "expected ANSI escape codes, got {output:?}"
        );
        // Bold is attribute 1
        assert!(output.contains("\x1b[1m"));
    }

    #[test]
    fn ansi_codes_absent_when_disabled() {
        for message_type in [
            MessageType::Info,
            MessageType::Success,
            MessageType::Error,
            MessageType::Highlight,
        ] {
            let output = render(message_type, "Check", "plain", true);

            assert!(
                !output.contains("\x1b["),
                "expected plain output, got {output:?}"
            );
            assert!(output.contains("Check"));
            assert!(output.contains("plain"));
        }
    }
}
