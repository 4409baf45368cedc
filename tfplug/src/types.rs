//! Attribute values, paths and diagnostics exchanged with the orchestrator
//!
//! Configuration, planned state and stored state all arrive as a
//! [`DynamicValue`]: an object of attribute name to [`Dynamic`]. Providers read
//! and write them through the typed accessors instead of matching directly.

use crate::error::{Result, TfplugError};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Sentinel used when an unknown value has to survive a JSON round trip
pub const UNKNOWN_SENTINEL: &str = "__unknown__";

/// Dynamic represents Terraform values that can be of any type
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    Bool(bool),
    /// All numbers are f64 to match Terraform
    Number(f64),
    String(String),
    List(Vec<Dynamic>),
    /// Objects are represented as maps
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl From<Value> for Dynamic {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Dynamic::Null,
            Value::Bool(b) => Dynamic::Bool(b),
            Value::Number(n) => n.as_f64().map_or(Dynamic::Null, Dynamic::Number),
            Value::String(s) if s == UNKNOWN_SENTINEL => Dynamic::Unknown,
            Value::String(s) => Dynamic::String(s),
            Value::Array(items) => Dynamic::List(items.into_iter().map(Dynamic::from).collect()),
            Value::Object(fields) => Dynamic::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Dynamic::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Dynamic> for Value {
    fn from(value: &Dynamic) -> Self {
        match value {
            Dynamic::Null => Value::Null,
            Dynamic::Bool(b) => Value::Bool(*b),
            Dynamic::Number(n) => {
                serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number)
            }
            Dynamic::String(s) => Value::String(s.clone()),
            Dynamic::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            Dynamic::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
            Dynamic::Unknown => Value::String(UNKNOWN_SENTINEL.to_string()),
        }
    }
}

/// DynamicValue wraps Dynamic and is what gets passed between Terraform and
/// the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    /// An object with no attributes set
    pub fn object() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&Value::from(&self.value))?)
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::null());
        }
        let value: Value = serde_json::from_slice(data)?;
        Ok(Self {
            value: Dynamic::from(value),
        })
    }

    /// Raw lookup; `None` when any step of the path is absent
    pub fn get(&self, path: &AttributePath) -> Option<&Dynamic> {
        path.steps.iter().try_fold(&self.value, |current, step| match current {
            Dynamic::Map(m) => m.get(step),
            _ => None,
        })
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        match self.lookup(path)? {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(TfplugError::TypeMismatch {
                path: path.to_string(),
                expected: "string",
                actual: other.type_name(),
            }),
        }
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        match self.lookup(path)? {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(TfplugError::TypeMismatch {
                path: path.to_string(),
                expected: "bool",
                actual: other.type_name(),
            }),
        }
    }

    /// Absent and null both read as `None`; unknown is a type mismatch
    pub fn get_optional_string(&self, path: &AttributePath) -> Result<Option<String>> {
        match self.get(path) {
            None | Some(Dynamic::Null) => Ok(None),
            Some(Dynamic::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(TfplugError::TypeMismatch {
                path: path.to_string(),
                expected: "string",
                actual: other.type_name(),
            }),
        }
    }

    pub fn set_string(&mut self, path: &AttributePath, value: impl Into<String>) -> Result<()> {
        self.set_value(path, Dynamic::String(value.into()))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_value(path, Dynamic::Bool(value))
    }

    /// Sets the value at `path`, creating intermediate objects as needed
    pub fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        // Writing an attribute turns a null or unknown root into an object
        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        for step in parents {
            current = match current {
                Dynamic::Map(m) => m
                    .entry(step.clone())
                    .or_insert_with(|| Dynamic::Map(HashMap::new())),
                _ => return Err(TfplugError::InvalidPath(path.to_string())),
            };
        }

        match current {
            Dynamic::Map(m) => {
                m.insert(last.clone(), new_value);
                Ok(())
            }
            _ => Err(TfplugError::InvalidPath(path.to_string())),
        }
    }

    fn lookup(&self, path: &AttributePath) -> Result<&Dynamic> {
        self.get(path)
            .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string()))
    }
}

impl From<HashMap<String, Dynamic>> for DynamicValue {
    fn from(values: HashMap<String, Dynamic>) -> Self {
        Self::new(Dynamic::Map(values))
    }
}

/// AttributePath addresses an attribute, possibly nested inside objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    pub steps: Vec<String>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![name.to_string()],
        }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps.push(name.to_string());
        self
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.steps.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A user-facing message attached to a response
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.summary)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " ({})", attribute)?;
        }
        if !self.detail.is_empty() {
            write!(f, "\n  {}", self.detail)?;
        }
        Ok(())
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
