//! Field paths and field errors
//!
//! Errors render the way the Kubernetes API server reports them, e.g.
//! `spec.provider.workers[0].name: Invalid value: "Worker": must be a DNS label`.

use serde::Serialize;
use std::fmt;

/// Path to a field of an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(root: &str) -> Self {
        Self(root.to_string())
    }

    /// Path of a named child field
    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            return Self::new(name);
        }
        Self(format!("{}.{}", self.0, name))
    }

    /// Path of a list element
    pub fn index(&self, i: usize) -> Self {
        Self(format!("{}[{}]", self.0, i))
    }

    /// Path of a map entry
    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{}]", self.0, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a field error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldErrorType {
    Required,
    Invalid,
    Forbidden,
    Duplicate,
    NotSupported,
    TooLong,
}

impl FieldErrorType {
    /// Kubernetes reason string
    pub fn reason(&self) -> &'static str {
        match self {
            FieldErrorType::Required => "FieldValueRequired",
            FieldErrorType::Invalid => "FieldValueInvalid",
            FieldErrorType::Forbidden => "FieldValueForbidden",
            FieldErrorType::Duplicate => "FieldValueDuplicate",
            FieldErrorType::NotSupported => "FieldValueNotSupported",
            FieldErrorType::TooLong => "FieldValueTooLong",
        }
    }
}

impl fmt::Display for FieldErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorType::Required => write!(f, "Required value"),
            FieldErrorType::Invalid => write!(f, "Invalid value"),
            FieldErrorType::Forbidden => write!(f, "Forbidden"),
            FieldErrorType::Duplicate => write!(f, "Duplicate value"),
            FieldErrorType::NotSupported => write!(f, "Unsupported value"),
            FieldErrorType::TooLong => write!(f, "Too long"),
        }
    }
}

/// A single problem with a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    #[serde(rename = "type")]
    pub type_: FieldErrorType,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad_value: Option<String>,
    pub detail: String,
}

impl FieldError {
    fn new(type_: FieldErrorType, path: &FieldPath, bad_value: Option<String>, detail: &str) -> Self {
        Self {
            type_,
            field: path.to_string(),
            bad_value,
            detail: detail.to_string(),
        }
    }

    pub fn required(path: &FieldPath, detail: &str) -> Self {
        Self::new(FieldErrorType::Required, path, None, detail)
    }

    pub fn invalid(path: &FieldPath, value: impl fmt::Display, detail: &str) -> Self {
        Self::new(FieldErrorType::Invalid, path, Some(value.to_string()), detail)
    }

    pub fn forbidden(path: &FieldPath, detail: &str) -> Self {
        Self::new(FieldErrorType::Forbidden, path, None, detail)
    }

    pub fn duplicate(path: &FieldPath, value: impl fmt::Display) -> Self {
        Self::new(FieldErrorType::Duplicate, path, Some(value.to_string()), "")
    }

    pub fn not_supported(path: &FieldPath, value: impl fmt::Display, supported: &[&str]) -> Self {
        let detail = supported
            .iter()
            .map(|s| format!("{:?}", s))
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(
            FieldErrorType::NotSupported,
            path,
            Some(value.to_string()),
            &format!("supported values: {}", detail),
        )
    }

    pub fn too_long(path: &FieldPath, value: impl fmt::Display, max: usize) -> Self {
        Self::new(
            FieldErrorType::TooLong,
            path,
            Some(value.to_string()),
            &format!("must have at most {} characters", max),
        )
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.type_)?;
        if let Some(value) = &self.bad_value {
            write!(f, ": {:?}", value)?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// All field errors of an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn append(&mut self, mut other: ErrorList) {
        self.0.append(&mut other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Whether an error was reported for exactly this field
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok` when empty
    pub fn into_result(self) -> std::result::Result<(), ErrorList> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => Ok(()),
            [single] => write!(f, "{}", single),
            many => {
                let joined = many.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                write!(f, "[{}]", joined)
            }
        }
    }
}

impl std::error::Error for ErrorList {}

impl Extend<FieldError> for ErrorList {
    fn extend<T: IntoIterator<Item = FieldError>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<T: IntoIterator<Item = FieldError>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
