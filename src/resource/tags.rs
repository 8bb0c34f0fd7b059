//! Tag helpers shared by resources that carry ARM tags

use crate::error::FieldError;
use serde_json::Value;
use std::collections::BTreeMap;

pub const MAX_TAGS: usize = 50;
pub const MAX_TAG_KEY_LENGTH: usize = 512;
pub const MAX_TAG_VALUE_LENGTH: usize = 256;

pub type Tags = BTreeMap<String, String>;

/// Configuration tags to the request shape; ARM accepts an empty object
pub fn expand_tags(tags: &Tags) -> Option<Tags> {
    Some(tags.clone())
}

/// Response tags to the configuration shape
pub fn flatten_tags(tags: Option<&Tags>) -> Tags {
    tags.cloned().unwrap_or_default()
}

/// Decode a loosely-typed tag map; numbers and booleans are stringified
pub fn decode_tags(field: &str, value: Option<&Value>) -> Result<Tags, Vec<FieldError>> {
    let Some(value) = value else {
        return Ok(Tags::new());
    };
    if value.is_null() {
        return Ok(Tags::new());
    }
    let Some(map) = value.as_object() else {
        return Err(vec![FieldError::new(field, "expected a map of strings")]);
    };

    let mut tags = Tags::new();
    let mut errors = Vec::new();
    for (key, raw) in map {
        let rendered = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                errors.push(FieldError::new(
                    format!("{}.{}", field, key),
                    "tag values must be strings, numbers or booleans",
                ));
                continue;
            }
        };
        tags.insert(key.clone(), rendered);
    }

    errors.extend(validate_tags(field, &tags));
    if errors.is_empty() {
        Ok(tags)
    } else {
        Err(errors)
    }
}

/// ARM tag limits
pub fn validate_tags(field: &str, tags: &Tags) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if tags.len() > MAX_TAGS {
        errors.push(FieldError::new(
            field,
            format!("a maximum of {} tags can be applied, got {}", MAX_TAGS, tags.len()),
        ));
    }
    for (key, value) in tags {
        if key.len() > MAX_TAG_KEY_LENGTH {
            errors.push(FieldError::new(
                field,
                format!("the maximum length for a tag key is {} characters", MAX_TAG_KEY_LENGTH),
            ));
        }
        if value.len() > MAX_TAG_VALUE_LENGTH {
            errors.push(FieldError::new(
                format!("{}.{}", field, key),
                format!(
                    "the maximum length for a tag value is {} characters",
                    MAX_TAG_VALUE_LENGTH
                ),
            ));
        }
    }
    errors
}
