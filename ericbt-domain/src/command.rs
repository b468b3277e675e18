//! JSON command protocol: `{"BL": "on"|"off", "LCD0": "...", "LCD1": "..."}`

use std::fmt;
use std::str::Utf8Error;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::display::{CharacterDisplay, DisplayError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Backlight {
    On,
    Off,
}

/// Only `"off"` turns the backlight off; any other string means on.
impl From<String> for Backlight {
    fn from(value: String) -> Self {
        if value == "off" {
            Backlight::Off
        } else {
            Backlight::On
        }
    }
}

impl From<Backlight> for String {
    fn from(value: Backlight) -> Self {
        match value {
            Backlight::On => "on".to_string(),
            Backlight::Off => "off".to_string(),
        }
    }
}

pub const KEY_BACKLIGHT: &str = "BL";
pub const KEY_ROW0: &str = "LCD0";
pub const KEY_ROW1: &str = "LCD1";

/// One display update. Absent fields leave the display as it was and
/// unknown keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Command {
    #[serde(rename = "BL", skip_serializing_if = "Option::is_none")]
    pub backlight: Option<Backlight>,
    #[serde(rename = "LCD0", skip_serializing_if = "Option::is_none")]
    pub row0: Option<String>,
    #[serde(rename = "LCD1", skip_serializing_if = "Option::is_none")]
    pub row1: Option<String>,
}

#[derive(Debug)]
pub enum CommandError {
    Utf8(Utf8Error),
    Json(serde_json::Error),
    /// A row key carried something other than a string
    NotText(&'static str),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Utf8(e) => write!(f, "payload is not UTF-8: {e}"),
            CommandError::Json(e) => write!(f, "payload is not a command: {e}"),
            CommandError::NotText(key) => write!(f, "{key} must be a string"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Utf8(e) => Some(e),
            CommandError::Json(e) => Some(e),
            CommandError::NotText(_) => None,
        }
    }
}

impl From<Utf8Error> for CommandError {
    fn from(e: Utf8Error) -> Self {
        CommandError::Utf8(e)
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::Json(e)
    }
}

/// Decode written bytes as UTF-8 and strip surrounding whitespace.
pub fn payload_text(payload: &[u8]) -> Result<&str, CommandError> {
    Ok(std::str::from_utf8(payload)?.trim())
}

fn row_text(fields: &mut Map<String, Value>, key: &'static str) -> Result<Option<String>, CommandError> {
    match fields.remove(key) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(CommandError::NotText(key)),
    }
}

impl Command {
    /// Parse a JSON object. Anything else is rejected; a repeated key keeps
    /// its last value.
    pub fn parse(text: &str) -> Result<Command, CommandError> {
        let mut fields: Map<String, Value> = serde_json::from_str(text)?;
        let backlight = fields.remove(KEY_BACKLIGHT).map(|value| match value {
            Value::String(state) => Backlight::from(state),
            _ => Backlight::On,
        });
        Ok(Command {
            backlight,
            row0: row_text(&mut fields, KEY_ROW0)?,
            row1: row_text(&mut fields, KEY_ROW1)?,
        })
    }

    pub fn from_payload(payload: &[u8]) -> Result<Command, CommandError> {
        Command::parse(payload_text(payload)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Backlight first, then row 0, then row 1. The display is never cleared,
    /// and a failing call leaves the earlier fields applied.
    pub fn apply<D>(&self, display: &mut D) -> Result<(), DisplayError>
    where
        D: CharacterDisplay + ?Sized,
    {
        match self.backlight {
            Some(Backlight::On) => display.backlight_on()?,
            Some(Backlight::Off) => display.backlight_off()?,
            None => {}
        }
        if let Some(text) = &self.row0 {
            display.move_to(0, 0)?;
            display.putstr(text)?;
        }
        if let Some(text) = &self.row1 {
            display.move_to(0, 1)?;
            display.putstr(text)?;
        }
        Ok(())
    }
}
