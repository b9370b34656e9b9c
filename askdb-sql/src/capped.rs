use serde::{Serialize, Serializer};

use crate::{CommonValues, Rows, SqlToolsError};

pub const TOO_LONG_SENTINEL: &str = "Sorry, SQL response was too long";

/// Text a result is measured by before it is handed to the model.
pub trait ResponseText {
    fn response_text(&self) -> Result<String, SqlToolsError>;
}

impl ResponseText for String {
    fn response_text(&self) -> Result<String, SqlToolsError> {
        Ok(self.clone())
    }
}

impl ResponseText for Rows {
    fn response_text(&self) -> Result<String, SqlToolsError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ResponseText for CommonValues {
    fn response_text(&self) -> Result<String, SqlToolsError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A result, or the marker that it was too large to pass on.
#[derive(Clone, Debug, PartialEq)]
pub enum Capped<T> {
    Value(T),
    TooLong,
}

impl<T> Capped<T> {
    pub fn is_too_long(&self) -> bool {
        matches!(self, Capped::TooLong)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Capped::Value(value) => Some(value),
            Capped::TooLong => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Capped::Value(value) => Some(value),
            Capped::TooLong => None,
        }
    }
}

impl<T: ResponseText> Capped<T> {
    /// The text the model sees: the value, or the sentinel.
    pub fn render(&self) -> Result<String, SqlToolsError> {
        match self {
            Capped::Value(value) => value.response_text(),
            Capped::TooLong => Ok(TOO_LONG_SENTINEL.to_string()),
        }
    }
}

impl<T: Serialize> Serialize for Capped<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Capped::Value(value) => value.serialize(serializer),
            Capped::TooLong => serializer.serialize_str(TOO_LONG_SENTINEL),
        }
    }
}

/// Replaces `value` with [`Capped::TooLong`] when its text exceeds
/// `max_chars` characters.
pub fn cap_response<T: ResponseText>(value: T, max_chars: usize) -> Result<Capped<T>, SqlToolsError> {
    if value.response_text()?.chars().count() > max_chars {
        Ok(Capped::TooLong)
    } else {
        Ok(Capped::Value(value))
    }
}
