use crate::error::{ContactError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Raw request body. Absent and `null` fields are both treated as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl ContactForm {
    /// Parses a request body. Only a JSON object is accepted; the derived
    /// deserializer alone would also take a positional array.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ContactError::InvalidBody(e.to_string()))?;

        if !value.is_object() {
            return Err(ContactError::InvalidBody(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }

        serde_json::from_value(value).map_err(|e| ContactError::InvalidBody(e.to_string()))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A submission whose fields are all present and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub name: String,
    pub email: String,
    pub message: String,
}

pub fn validate(form: ContactForm) -> Result<SubmissionPayload> {
    match (required(form.name), required(form.email), required(form.message)) {
        (Some(name), Some(email), Some(message)) => Ok(SubmissionPayload {
            name,
            email,
            message,
        }),
        _ => Err(ContactError::MissingFields),
    }
}

fn required(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
