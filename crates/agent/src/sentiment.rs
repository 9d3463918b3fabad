use std::fmt;
use std::sync::Arc;

use crate::llm::LlmClient;
use crate::prompts::{CompletionError, PromptKind, PromptLibrary};

pub const POSITIVE: &str = "positive";

/// Normalized (trimmed, lowercased) sentiment label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentiment(String);

impl Sentiment {
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn is_positive(&self) -> bool {
        self.0 == POSITIVE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
pub struct SentimentExtractor {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl SentimentExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }

    pub async fn extract(&self, message: &str) -> Result<Sentiment, CompletionError> {
        let raw =
            self.prompts.complete(self.llm.as_ref(), PromptKind::PostInspection, message).await?;
        Ok(Sentiment::from_raw(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::Sentiment;

    #[test]
    fn label_is_trimmed_and_lowercased() {
        let sentiment = Sentiment::from_raw("  Positive\n");
        assert!(sentiment.is_positive());
        assert_eq!(sentiment.as_str(), "positive");
    }

    #[test]
    fn anything_else_is_not_positive() {
        assert!(!Sentiment::from_raw("negative").is_positive());
        assert!(!Sentiment::from_raw("neutral").is_positive());
        assert!(!Sentiment::from_raw("positive!").is_positive());
    }
}
