use crate::{
    flag::{TargetKey, TargetKeyType},
    EvaluationError, InternalUser, PropertyValue, Result,
};

/// Resolves the runtime user value a condition compares against, dispatching on the target key
/// type.
#[derive(Debug, Default)]
pub struct UserValueResolver;

impl UserValueResolver {
    /// Resolve the value for the given key, or `None` when the user has no such value.
    ///
    /// `SEGMENT` keys cannot be resolved to a value: segment membership must be evaluated by the
    /// segment matcher, so asking for it here is a programming error.
    pub fn resolve_or_none(
        &self,
        user: &InternalUser,
        key: &TargetKey,
    ) -> Result<Option<PropertyValue>> {
        match key.key_type {
            TargetKeyType::UserId => Ok(user
                .identifier(&key.name)
                .map(|it| PropertyValue::String(it.to_owned()))),
            TargetKeyType::UserProperty => Ok(user.property(&key.name).cloned()),
            // Computed properties are resolved outside this layer.
            TargetKeyType::SystemProperty => Ok(None),
            TargetKeyType::Segment => {
                Err(EvaluationError::UnsupportedTargetKeyType(key.key_type))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::UserValueResolver;
    use crate::{
        flag::{TargetKey, TargetKeyType},
        EvaluationError, InternalUser, PropertyValue,
    };

    fn user() -> InternalUser {
        InternalUser::new(
            HashMap::from([("$id".to_owned(), "user-1".to_owned())]),
            HashMap::from([("age".to_owned(), 30.0.into())]),
        )
    }

    fn key(key_type: TargetKeyType, name: &str) -> TargetKey {
        TargetKey {
            key_type,
            name: name.to_owned(),
        }
    }

    #[test]
    fn resolves_identifier_by_name() {
        let value = UserValueResolver
            .resolve_or_none(&user(), &key(TargetKeyType::UserId, "$id"))
            .unwrap();
        assert_eq!(value, Some("user-1".into()));
    }

    #[test]
    fn resolves_property_by_name() {
        let value = UserValueResolver
            .resolve_or_none(&user(), &key(TargetKeyType::UserProperty, "age"))
            .unwrap();
        assert_eq!(value, Some(30.0.into()));
    }

    #[test]
    fn missing_values_resolve_to_none() {
        let resolver = UserValueResolver;
        assert_eq!(
            resolver
                .resolve_or_none(&user(), &key(TargetKeyType::UserId, "$deviceId"))
                .unwrap(),
            None
        );
        assert_eq!(
            resolver
                .resolve_or_none(&user(), &key(TargetKeyType::UserProperty, "grade"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn system_properties_always_resolve_to_none() {
        let value = UserValueResolver
            .resolve_or_none(&user(), &key(TargetKeyType::SystemProperty, "osName"))
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn segment_keys_are_a_programming_error() {
        let result =
            UserValueResolver.resolve_or_none(&user(), &key(TargetKeyType::Segment, "seg"));
        assert_eq!(
            result,
            Err(EvaluationError::UnsupportedTargetKeyType(
                TargetKeyType::Segment
            ))
        );
    }

    #[test]
    fn resolved_identifier_is_a_string_value() {
        let value = UserValueResolver
            .resolve_or_none(&user(), &key(TargetKeyType::UserId, "$id"))
            .unwrap();
        assert!(matches!(value, Some(PropertyValue::String(_))));
    }
}
