use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// Type alias for a HashMap representing key-value pairs of user properties.
///
/// Keys are strings representing property names.
///
/// # Examples
/// ```
/// # use flagon_core::{Properties, PropertyValue};
/// let properties = [
///     ("age".to_owned(), 30.0.into()),
///     ("grade".to_owned(), "gold".into()),
///     ("is_paying".to_owned(), true.into()),
/// ].into_iter().collect::<Properties>();
/// ```
pub type Properties = HashMap<String, PropertyValue>;

/// Enum representing possible values of a user property or a targeting match operand.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `f64`, and `bool` types.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A string value.
    String(String),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// A null value or absence of value.
    Null,
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        if let PropertyValue::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        if let PropertyValue::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    /// Coerce the value to identifier text. Numbers that hold an integral value are formatted
    /// without a fractional part (`1.0` becomes `"1"`). `Null` has no text form.
    pub(crate) fn to_identifier_string(&self) -> Option<String> {
        match self {
            PropertyValue::String(s) => Some(s.clone()),
            PropertyValue::Number(n) => {
                let i = *n as i64;
                if i as f64 == *n {
                    Some(i.to_string())
                } else {
                    Some(n.to_string())
                }
            }
            PropertyValue::Boolean(b) => Some(b.to_string()),
            PropertyValue::Null => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}
