//! Input command definitions
//!
//! Commands travel on the input channel as UTF-8 JSON documents tagged by a
//! `type` field:
//!
//! ```json
//! {"type": "click", "x": 50, "y": 60, "button": "right"}
//! {"type": "dclick", "x": 10, "y": 20, "button": "left"}
//! {"type": "key", "key": "Return"}
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::ProtocolError;

/// X button id for the primary button
const BUTTON_ID_LEFT: u8 = 1;

/// X button id for the secondary button
const BUTTON_ID_RIGHT: u8 = 3;

/// Pointer button carried by click commands
///
/// Any value other than `"right"` is read as the primary button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    /// Primary button
    #[default]
    Left,
    /// Secondary button
    Right,
}

impl MouseButton {
    /// Button id used by the synthetic input primitive
    pub fn button_id(self) -> u8 {
        match self {
            MouseButton::Right => BUTTON_ID_RIGHT,
            MouseButton::Left => BUTTON_ID_LEFT,
        }
    }

    /// Wire name of the button
    pub fn as_str(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MouseButton {
    fn from(name: &str) -> Self {
        match name {
            "right" => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

impl Serialize for MouseButton {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MouseButton {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(MouseButton::from(name.as_str()))
    }
}

/// Command sent by the viewer on the input channel
///
/// Coordinates are window-local pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputCommand {
    /// Single press and release
    Click {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
        /// Button to press, left when absent
        #[serde(default)]
        button: MouseButton,
    },

    /// Two press and release pairs
    #[serde(rename = "dclick")]
    DoubleClick {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
        /// Button to press, left when absent
        #[serde(default)]
        button: MouseButton,
    },

    /// Key down then key up
    Key {
        /// Single character or keysym name
        key: String,
    },
}

impl InputCommand {
    /// Parses a command from a channel payload
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` for invalid UTF-8, malformed JSON or an
    /// unknown command type
    pub fn from_json(payload: &[u8]) -> std::result::Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Serializes the command for the input channel
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` if serialization fails
    pub fn to_json(&self) -> std::result::Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Returns true if this is a key command naming the stop key
    pub fn is_stop(&self, stop_key: &str) -> bool {
        matches!(self, InputCommand::Key { key } if key == stop_key)
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            InputCommand::Click { .. } => "click",
            InputCommand::DoubleClick { .. } => "dclick",
            InputCommand::Key { .. } => "key",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_click() {
        let command =
            InputCommand::from_json(br#"{"type":"click","button":"right","x":50,"y":60}"#)
                .unwrap();
        assert_eq!(
            command,
            InputCommand::Click {
                x: 50,
                y: 60,
                button: MouseButton::Right
            }
        );
    }

    #[test]
    fn test_parse_double_click_defaults_to_left() {
        let command = InputCommand::from_json(br#"{"type":"dclick","x":1,"y":2}"#).unwrap();
        assert_eq!(
            command,
            InputCommand::DoubleClick {
                x: 1,
                y: 2,
                button: MouseButton::Left
            }
        );

        let command =
            InputCommand::from_json(br#"{"type":"click","x":1,"y":2,"button":"middle"}"#).unwrap();
        assert!(matches!(
            command,
            InputCommand::Click {
                button: MouseButton::Left,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_key_and_stop() {
        let command = InputCommand::from_json(br#"{"type":"key","key":"\u001b"}"#).unwrap();
        assert!(command.is_stop("\u{1b}"));
        assert_eq!(command.kind(), "key");

        let command = InputCommand::from_json(br#"{"type":"key","key":"a"}"#).unwrap();
        assert!(!command.is_stop("\u{1b}"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(InputCommand::from_json(b"{not json").is_err());
        assert!(InputCommand::from_json(br#"{"type":"scroll","x":1}"#).is_err());
        assert!(InputCommand::from_json(br#"{"type":"click","x":"a","y":2}"#).is_err());
        assert!(InputCommand::from_json(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_wire_shape() {
        let command = InputCommand::DoubleClick {
            x: 3,
            y: 4,
            button: MouseButton::Right,
        };
        let value: serde_json::Value = serde_json::from_slice(&command.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "dclick");
        assert_eq!(value["button"], "right");
        assert_eq!(value["x"], 3);
    }

    #[test]
    fn test_button_ids() {
        assert_eq!(MouseButton::Right.button_id(), 3);
        assert_eq!(MouseButton::Left.button_id(), 1);
    }
}
