use std::fmt;

use miette::{NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};

use crate::GuardError;

/// Identifier of a form as assigned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(String);

impl FormId {
    pub fn new(id: impl Into<String>) -> Self {
        FormId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FormId {
    fn from(id: &str) -> Self {
        FormId(id.to_string())
    }
}

/// Declared type of an input field. Only `Email` is inspected by the guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Email,
    Text,
    Textarea,
    Number,
    Phone,
    Hidden,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub value: String,
}

impl Field {
    pub fn new(field_type: FieldType, value: impl Into<String>) -> Self {
        Field {
            field_type,
            value: value.into(),
        }
    }

    pub fn email(value: impl Into<String>) -> Self {
        Self::new(FieldType::Email, value)
    }

    pub fn is_email(&self) -> bool {
        self.field_type == FieldType::Email
    }
}

/// Guard-specific settings stored inside the host's form definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSettings {
    /// Absent in older form definitions, which reads as disabled.
    #[serde(rename = "gf_email_blocker_enabled", default)]
    pub email_blocker_enabled: bool,
}

impl FormSettings {
    /// Builds settings from a submitted settings page, where an unchecked
    /// checkbox is simply missing from the submission.
    pub fn from_checkbox(checkbox: Option<&str>) -> Self {
        FormSettings {
            email_blocker_enabled: checkbox.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    pub id: FormId,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub settings: FormSettings,
}

impl Form {
    pub fn new(id: impl Into<FormId>) -> Self {
        Form {
            id: id.into(),
            fields: Vec::new(),
            settings: FormSettings::default(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.email_blocker_enabled
    }

    /// Flips the toggle in place; persisting the form is up to the caller.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.email_blocker_enabled = enabled;
    }

    /// Parses a form definition, pointing at the offending spot on failure.
    pub fn from_json(name: &str, src: &str) -> Result<Self, GuardError> {
        serde_json::from_str(src).map_err(|e| {
            let offset = offset_of(src, e.line(), e.column());
            GuardError::FormParse {
                message: e.to_string(),
                src: NamedSource::new(name, src.to_string()),
                span: SourceSpan::from((offset, 0)),
            }
        })
    }
}

// serde_json reports 1-based lines and columns.
fn offset_of(src: &str, line: usize, column: usize) -> usize {
    let line_start: usize = src
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(src.len())
}
