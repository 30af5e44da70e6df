use std::collections::HashMap;

use crate::{Properties, PropertyValue};

const MAX_IDENTIFIER_TYPE_LENGTH: usize = 128;
const MAX_IDENTIFIER_VALUE_LENGTH: usize = 512;

/// A user as seen by the evaluation engine: a mapping of identifier kind to identifier value
/// (keys like `$id`, `$deviceId`, or custom names) plus a mapping of property name to value.
///
/// Built once per request and treated as read-only thereafter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternalUser {
    identifiers: HashMap<String, String>,
    properties: Properties,
}

impl InternalUser {
    pub fn new(identifiers: HashMap<String, String>, properties: Properties) -> InternalUser {
        InternalUser {
            identifiers,
            properties,
        }
    }

    /// Look up the identifier value for the given identifier type.
    pub fn identifier(&self, identifier_type: &str) -> Option<&str> {
        self.identifiers.get(identifier_type).map(String::as_str)
    }

    /// Look up a user property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn identifiers(&self) -> &HashMap<String, String> {
        &self.identifiers
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// Validating builder for the identifier mapping of an [`InternalUser`].
///
/// The builder is permissive by design: a malformed identifier is dropped (with a warning log)
/// rather than aborting the whole request.
#[derive(Debug, Default)]
pub struct IdentifiersBuilder {
    identifiers: HashMap<String, String>,
}

impl IdentifiersBuilder {
    pub fn new() -> IdentifiersBuilder {
        IdentifiersBuilder::default()
    }

    /// Add a single identifier. Drops the entry if the type is empty or longer than 128
    /// characters, or if the value has no text form (null) or exceeds 512 characters after
    /// coercion to text. A later add for the same type overwrites the earlier one.
    pub fn add(&mut self, identifier_type: &str, value: impl Into<PropertyValue>) -> &mut Self {
        let value = value.into();

        if identifier_type.is_empty() || identifier_type.len() > MAX_IDENTIFIER_TYPE_LENGTH {
            log::warn!(target: "flagon", identifier_type; "invalid identifier type dropped");
            return self;
        }

        let Some(text) = value.to_identifier_string() else {
            log::warn!(target: "flagon", identifier_type; "null identifier value dropped");
            return self;
        };
        if text.is_empty() || text.len() > MAX_IDENTIFIER_VALUE_LENGTH {
            log::warn!(target: "flagon", identifier_type; "invalid identifier value dropped");
            return self;
        }

        self.identifiers.insert(identifier_type.to_owned(), text);
        self
    }

    /// Add every entry of the mapping via [`IdentifiersBuilder::add`].
    pub fn add_identifiers<K, V, I>(&mut self, identifiers: I) -> &mut Self
    where
        K: AsRef<str>,
        V: Into<PropertyValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (identifier_type, value) in identifiers {
            self.add(identifier_type.as_ref(), value);
        }
        self
    }

    /// Return the accumulated identifier mapping.
    pub fn build(&self) -> HashMap<String, String> {
        self.identifiers.clone()
    }
}
