//! Line-based input source for the viewer
//!
//! Stands in for a GUI event loop. Each line becomes one command:
//!
//! ```text
//! click 50 60 right
//! dclick 10 20
//! key Return
//! esc
//! ```

use std::io::BufRead;

use tracing::{debug, warn};

use crate::client::queue::InputQueue;
use crate::error::ProtocolError;
use crate::network::{InputCommand, MouseButton};

/// Key name sent by `esc`, the host treats it as the stop key by default
const ESCAPE_KEY: &str = "\u{1b}";

/// Parses one console line, `None` for blank lines
///
/// # Errors
///
/// Returns `InvalidCommand` for unknown verbs or bad coordinates
pub fn parse_line(line: &str) -> Result<Option<InputCommand>, ProtocolError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb {
        "click" | "dclick" => {
            let x = parse_coordinate(words.next(), line)?;
            let y = parse_coordinate(words.next(), line)?;
            let button = words.next().map(MouseButton::from).unwrap_or_default();
            if verb == "click" {
                InputCommand::Click { x, y, button }
            } else {
                InputCommand::DoubleClick { x, y, button }
            }
        }
        "key" => {
            let key = words
                .next()
                .ok_or_else(|| ProtocolError::InvalidCommand(format!("missing key in {:?}", line)))?;
            InputCommand::Key {
                key: key.to_string(),
            }
        }
        "esc" => InputCommand::Key {
            key: ESCAPE_KEY.to_string(),
        },
        other => {
            return Err(ProtocolError::InvalidCommand(format!(
                "unknown command {:?}",
                other
            )))
        }
    };

    Ok(Some(command))
}

fn parse_coordinate(word: Option<&str>, line: &str) -> Result<i32, ProtocolError> {
    word.and_then(|w| w.parse().ok())
        .ok_or_else(|| ProtocolError::InvalidCommand(format!("bad coordinates in {:?}", line)))
}

/// Feeds lines from `reader` into the queue until EOF
///
/// Blocks the calling thread, run it on a dedicated thread for stdin.
pub fn read_commands<R: BufRead>(reader: R, queue: &InputQueue) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read console input: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Ok(Some(command)) => {
                debug!("Queued {} command", command.kind());
                queue.push(command);
            }
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }
    debug!("Console input closed");
}
