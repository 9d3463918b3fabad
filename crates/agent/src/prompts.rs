use tera::{Context, Tera};
use thiserror::Error;

use crate::llm::{LlmClient, LlmError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    IntentClassification,
    PropertyInquiry,
    PostInspection,
}

impl PromptKind {
    pub const ALL: [PromptKind; 3] =
        [Self::IntentClassification, Self::PropertyInquiry, Self::PostInspection];

    fn template_name(&self) -> &'static str {
        match self {
            Self::IntentClassification => "intent_classification.txt",
            Self::PropertyInquiry => "property_inquiry.txt",
            Self::PostInspection => "post_inspection.txt",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Self::IntentClassification => {
                include_str!("../../../templates/prompts/intent_classification.txt")
            }
            Self::PropertyInquiry => {
                include_str!("../../../templates/prompts/property_inquiry.txt")
            }
            Self::PostInspection => include_str!("../../../templates/prompts/post_inspection.txt"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template error: {0}")]
    Template(#[from] tera::Error),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// The three prompt templates, compiled once at startup.
pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        for kind in PromptKind::ALL {
            tera.add_raw_template(kind.template_name(), kind.source())?;
        }
        Ok(Self { tera })
    }

    pub fn render(&self, kind: PromptKind, message: &str) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("message", message);
        Ok(self.tera.render(kind.template_name(), &context)?)
    }

    /// Renders `kind` around `message` and returns the model's raw reply.
    pub async fn complete(
        &self,
        llm: &dyn LlmClient,
        kind: PromptKind,
        message: &str,
    ) -> Result<String, CompletionError> {
        let prompt = self.render(kind, message)?;
        Ok(llm.complete(&prompt).await?)
    }
}
