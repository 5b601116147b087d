use serde_json::Value;

use crate::{ImageToolError, Result};

pub const PROMPT_DELIMITER: char = '|';

/// Positive and negative prompt for one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptInput {
    pub prompt: String,
    pub negative_prompt: String,
}

impl PromptInput {
    pub fn new(prompt: impl Into<String>, negative_prompt: impl Into<String>) -> Self {
        Self {
            prompt: flatten_newlines(&prompt.into()),
            negative_prompt: flatten_newlines(&negative_prompt.into()),
        }
    }

    /// Splits `"positive | negative"` on the first delimiter. Without a
    /// delimiter the whole input is the positive prompt.
    pub fn parse_delimited(input: &str) -> Self {
        let (prompt, negative) = input
            .split_once(PROMPT_DELIMITER)
            .unwrap_or((input, ""));
        Self::new(prompt.trim(), negative.trim())
    }

    /// Validates structured tool arguments: both fields must be non-empty
    /// strings.
    pub fn from_arguments(arguments: &Value) -> Result<Self> {
        let obj = arguments.as_object().ok_or_else(|| {
            ImageToolError::InvalidInput("expected an object with prompt and negative_prompt".into())
        })?;
        let prompt = required_string(obj, "prompt")?;
        let negative_prompt = required_string(obj, "negative_prompt")?;
        Ok(Self::new(prompt, negative_prompt))
    }

    /// Accepts either a JSON string (delimited form) or a structured object.
    pub fn from_text_arguments(arguments: &Value) -> Result<Self> {
        match arguments {
            Value::String(text) => Ok(Self::parse_delimited(text)),
            Value::Object(obj) => {
                let input = obj.get("input").and_then(Value::as_str).ok_or_else(|| {
                    ImageToolError::InvalidInput("input must be a string".to_string())
                })?;
                Ok(Self::parse_delimited(input))
            }
            _ => Err(ImageToolError::InvalidInput(
                "expected a prompt string".to_string(),
            )),
        }
    }
}

fn required_string(obj: &serde_json::Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Some(Value::String(_)) => Err(ImageToolError::InvalidInput(format!(
            "{field} must be a non-empty string"
        ))),
        Some(_) => Err(ImageToolError::InvalidInput(format!(
            "{field} must be a string"
        ))),
        None => Err(ImageToolError::InvalidInput(format!("{field} is required"))),
    }
}

fn flatten_newlines(input: &str) -> String {
    input.replace("\r\n", " ").replace(['\r', '\n'], " ")
}
