//! Resource schema declaration and field validators
//!
//! A schema is plain data: the host prints it, plans against it, and the
//! resource decodes configuration by it.

use serde::Serialize;

/// Value type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Map,
}

/// Named validator attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    ResourceGroupName,
    WorkspaceName,
    ResourceId,
}

impl Validator {
    pub fn check(self, value: &str) -> Result<(), String> {
        match self {
            Self::ResourceGroupName => validate_resource_group_name(value),
            Self::WorkspaceName => validate_workspace_name(value),
            Self::ResourceId => validate_resource_id(value),
        }
    }
}

/// One field of a resource schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub computed: bool,
    /// Changing this field requires destroy + recreate
    pub force_new: bool,
    /// Values differing only in ASCII case are considered equal
    pub case_insensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
    /// Nested fields for map-of-object fields
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elem: Vec<FieldSchema>,
}

impl FieldSchema {
    fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            computed: false,
            force_new: false,
            case_insensitive: false,
            default: None,
            allowed_values: Vec::new(),
            validator: None,
            elem: Vec::new(),
        }
    }

    pub fn required_string(name: &'static str) -> Self {
        Self {
            required: true,
            ..Self::new(name, FieldType::String)
        }
    }

    pub fn optional_string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn computed_string(name: &'static str) -> Self {
        Self {
            computed: true,
            ..Self::new(name, FieldType::String)
        }
    }

    pub fn required_map(name: &'static str) -> Self {
        Self {
            required: true,
            ..Self::new(name, FieldType::Map)
        }
    }

    pub fn optional_map(name: &'static str) -> Self {
        Self::new(name, FieldType::Map)
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub fn one_of(mut self, values: &[&'static str]) -> Self {
        self.allowed_values = values.to_vec();
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_elem(mut self, elem: FieldSchema) -> Self {
        self.elem.push(elem);
        self
    }

    /// Check a string value against this field's allowed list and validator
    pub fn validate(&self, value: &str) -> Result<(), String> {
        if !self.allowed_values.is_empty() && !self.allowed_values.contains(&value) {
            return Err(format!(
                "expected {} to be one of {:?}, got {:?}",
                self.name, self.allowed_values, value
            ));
        }
        match self.validator {
            Some(validator) => validator.check(value),
            None => Ok(()),
        }
    }

    /// True when `old` and `new` should not be reported as a change
    pub fn suppresses_diff(&self, old: &str, new: &str) -> bool {
        if self.case_insensitive {
            old.eq_ignore_ascii_case(new)
        } else {
            old == new
        }
    }
}

/// Schema of a resource type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub fields: Vec<FieldSchema>,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Workspace names: 4-63 characters, alphanumerics and hyphens, must start
/// and end with an alphanumeric
pub fn validate_workspace_name(name: &str) -> Result<(), String> {
    if name.len() < 4 || name.len() > 63 {
        return Err(format!(
            "workspace name must be between 4 and 63 characters, got {}",
            name.len()
        ));
    }

    let bytes = name.as_bytes();
    let edges_ok =
        bytes[0].is_ascii_alphanumeric() && bytes[bytes.len() - 1].is_ascii_alphanumeric();
    let body_ok = bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-');

    if !(edges_ok && body_ok) {
        return Err(format!(
            "workspace name {:?} can only contain alphabet, number, and '-' character, \
             and must start and end with an alphanumeric",
            name
        ));
    }
    Ok(())
}

/// Resource group names: up to 90 characters of word characters, `-`, `.`,
/// `(` and `)`, not ending in a period
pub fn validate_resource_group_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("resource group name cannot be empty".to_string());
    }
    if name.len() > 90 {
        return Err("resource group name may not exceed 90 characters".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '(' | ')'))
    {
        return Err(
            "resource group name may only contain alphanumerics, underscores, parentheses, \
             hyphens and periods"
                .to_string(),
        );
    }
    if name.ends_with('.') {
        return Err("resource group name cannot end with a period".to_string());
    }
    Ok(())
}

/// Well-formed Azure resource identifier
pub fn validate_resource_id(id: &str) -> Result<(), String> {
    super::id::ResourceId::parse(id)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
