use super::types::PostInput;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field name to the list of messages for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

/// Checks a create/update body and returns the trimmed title.
pub fn validate_post_input(input: &PostInput) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    match &input.title {
        Some(Value::String(s)) if !s.trim().is_empty() => return Ok(s.trim().to_string()),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            errors.add("title", "The title field is required.")
        }
        Some(_) => errors.add("title", "The title field must be a string."),
    }

    Err(errors)
}
