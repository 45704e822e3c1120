use crate::models::{Fields, ID_FIELD, STORE_ID_FIELD};
use crate::services::Page;
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const DEFAULT_LIST_LIMIT: u64 = 100;
pub const MAX_LIST_LIMIT: u64 = 1000;

/// Body of create and replace: a JSON object without an identifier.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(transparent)]
pub struct RecordPayload {
    #[validate(custom(function = "validate_fields"))]
    pub fields: Fields,
}

impl RecordPayload {
    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

/// Body of a partial update. `null` leaves the stored value untouched.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(transparent)]
pub struct RecordPatch {
    #[validate(custom(function = "validate_fields"))]
    pub fields: Fields,
}

impl RecordPatch {
    /// Fields to set, with null entries dropped.
    pub fn into_set_fields(self) -> Fields {
        self.fields
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListParams {
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListParams {
    pub fn page(&self) -> Page {
        Page {
            limit: self.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}

fn field_error(code: &'static str, field: &str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error.add_param(Cow::from("field"), &field);
    error
}

/// Field names must be usable as store keys and must not shadow the
/// identifier; values must be representable in the store. Name and value
/// rules apply at every nesting level.
fn validate_fields(fields: &Fields) -> Result<(), ValidationError> {
    if let Some(key) = fields
        .keys()
        .find(|key| *key == ID_FIELD || *key == STORE_ID_FIELD)
    {
        return Err(field_error(
            "reserved_field",
            key,
            format!("`{}` is assigned by the service and cannot be set", key),
        ));
    }
    validate_entries(fields)
}

fn validate_entries(fields: &Fields) -> Result<(), ValidationError> {
    for (key, value) in fields {
        validate_name(key)?;
        validate_value(key, value)?;
    }
    Ok(())
}

fn validate_name(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(field_error(
            "empty_field_name",
            key,
            "field names cannot be empty".to_string(),
        ));
    }
    if key.starts_with('$') || key.contains('.') {
        return Err(field_error(
            "invalid_field_name",
            key,
            format!("field `{}` cannot start with `$` or contain `.`", key),
        ));
    }
    Ok(())
}

fn validate_value(key: &str, value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::Number(n) if !(n.is_i64() || n.is_f64()) => Err(field_error(
            "unsupported_value",
            key,
            format!("field `{}` holds an integer larger than 64-bit signed", key),
        )),
        Value::Array(items) => items.iter().try_for_each(|item| validate_value(key, item)),
        Value::Object(map) => validate_entries(map),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> RecordPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_plain_object() {
        let payload = payload(json!({
            "name": "Jane Doe",
            "email": "jdoe@example.com",
            "course": "Experiments, Science, and Fashion in Nanophotonics",
            "gpa": 3.0
        }));

        assert!(payload.validate().is_ok());
        assert_eq!(payload.into_fields().len(), 4);
    }

    #[test]
    fn empty_object_is_a_valid_record() {
        assert!(payload(json!({})).validate().is_ok());
    }

    #[test]
    fn rejects_identifier_fields() {
        assert!(payload(json!({ "id": "x", "name": "a" })).validate().is_err());
        assert!(payload(json!({ "_id": "x" })).validate().is_err());
    }

    #[test]
    fn rejects_store_reserved_names() {
        assert!(payload(json!({ "$set": 1 })).validate().is_err());
        assert!(payload(json!({ "a.b": 1 })).validate().is_err());
        assert!(payload(json!({ "": 1 })).validate().is_err());
    }

    #[test]
    fn rejects_reserved_names_at_any_depth() {
        assert!(payload(json!({ "a": { "b.c": 1 } })).validate().is_err());
        assert!(payload(json!({ "a": { "$x": 2 } })).validate().is_err());
        assert!(payload(json!({ "a": [{ "ok": 1 }, { "": 1 }] }))
            .validate()
            .is_err());
    }

    #[test]
    fn identifier_names_are_only_reserved_at_the_top() {
        assert!(payload(json!({ "owner": { "id": 7 } })).validate().is_ok());
    }

    #[test]
    fn rejects_nested_unsigned_overflow() {
        let errors = payload(json!({ "stats": { "big": [u64::MAX] } }))
            .validate()
            .unwrap_err();

        assert!(errors.field_errors().contains_key("fields"));
    }

    #[test]
    fn non_objects_do_not_deserialize() {
        assert!(serde_json::from_value::<RecordPayload>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<RecordPayload>(json!("name")).is_err());
    }

    #[test]
    fn patch_drops_null_fields() {
        let patch: RecordPatch =
            serde_json::from_value(json!({ "name": "b", "gpa": null })).unwrap();

        let set = patch.into_set_fields();
        assert_eq!(set.len(), 1);
        assert_eq!(set["name"], json!("b"));
    }

    #[test]
    fn list_params_defaults_and_bounds() {
        let page = ListParams::default().page();
        assert_eq!(page.limit, DEFAULT_LIST_LIMIT);
        assert_eq!(page.offset, 0);

        let at_max = ListParams {
            limit: Some(MAX_LIST_LIMIT),
            offset: Some(5),
        };
        assert!(at_max.validate().is_ok());
        assert_eq!(at_max.page().offset, 5);

        let zero = ListParams {
            limit: Some(0),
            offset: None,
        };
        assert!(zero.validate().is_err());

        let over = ListParams {
            limit: Some(MAX_LIST_LIMIT + 1),
            offset: None,
        };
        assert!(over.validate().is_err());
    }
}
