use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

use intake_core::money::parse_amount;

use crate::llm::LlmClient;
use crate::prompts::{CompletionError, PromptKind, PromptLibrary};

pub const FIELD_PROPERTY_IDENTIFIER: &str = "Property_identifier";
pub const FIELD_NAME: &str = "name";
pub const FIELD_LOCATION: &str = "Location";
pub const FIELD_BEDROOMS: &str = "Bedrooms";
pub const FIELD_BUDGET: &str = "Budget";
pub const FIELD_OTHER_REQUIREMENTS: &str = "Any_other_specific_requirements";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("extraction output is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("extraction output must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Fields pulled out of a property inquiry. `None` means the model reported
/// nothing usable for that field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InquiryDetails {
    pub property_identifier: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub bedrooms: Option<i64>,
    pub budget: Option<Decimal>,
    pub other_requirements: Option<String>,
}

impl InquiryDetails {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Removes a surrounding ```` ```json ```` / ```` ``` ```` fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open =
        trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).unwrap_or(trimmed);
    let without_close = without_open.trim_end().strip_suffix("```").unwrap_or(without_open);
    without_close.trim()
}

pub fn parse_details(raw: &str) -> Result<InquiryDetails, ExtractionError> {
    let value: Value =
        serde_json::from_str(strip_code_fence(raw)).map_err(ExtractionError::InvalidJson)?;
    let fields = match value {
        Value::Object(fields) => fields,
        Value::Array(_) => return Err(ExtractionError::NotAnObject("array")),
        Value::String(_) => return Err(ExtractionError::NotAnObject("string")),
        Value::Number(_) => return Err(ExtractionError::NotAnObject("number")),
        Value::Bool(_) => return Err(ExtractionError::NotAnObject("boolean")),
        Value::Null => return Err(ExtractionError::NotAnObject("null")),
    };

    Ok(InquiryDetails {
        property_identifier: text_field(&fields, FIELD_PROPERTY_IDENTIFIER)
            .map(|id| id.trim_start_matches('#').trim().to_string())
            .filter(|id| !id.is_empty()),
        name: text_field(&fields, FIELD_NAME),
        location: text_field(&fields, FIELD_LOCATION),
        bedrooms: integer_field(&fields, FIELD_BEDROOMS),
        budget: text_field(&fields, FIELD_BUDGET).and_then(|budget| parse_amount(&budget)),
        other_requirements: text_field(&fields, FIELD_OTHER_REQUIREMENTS),
    })
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match fields.get(key)? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn integer_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|n| n.fract() == 0.0).map(|n| n as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Clone)]
pub struct DetailExtractor {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl DetailExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }

    pub async fn extract(&self, message: &str) -> Result<InquiryDetails, ExtractionError> {
        let raw =
            self.prompts.complete(self.llm.as_ref(), PromptKind::PropertyInquiry, message).await?;
        parse_details(&raw)
    }
}
