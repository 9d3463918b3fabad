use std::fmt;
use std::sync::Arc;

use crate::llm::LlmClient;
use crate::prompts::{CompletionError, PromptKind, PromptLibrary};

/// Label produced by the intent classifier.
///
/// Labels are matched case-sensitively. Anything outside the six known
/// labels is kept verbatim in `Unrecognized` and dispatched to the general
/// handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    PropertyInquiry,
    PropertyRecommendation,
    BudgetSharing,
    PostInspectionFeedback,
    PaymentMethod,
    GeneralQuery,
    Unrecognized(String),
}

impl Intent {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "property_inquiry" => Self::PropertyInquiry,
            "property_recommendation" => Self::PropertyRecommendation,
            "budget_sharing" => Self::BudgetSharing,
            "post_inspection_feedback" => Self::PostInspectionFeedback,
            "payment_method" => Self::PaymentMethod,
            "general_query" => Self::GeneralQuery,
            _ => Self::Unrecognized(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::PropertyInquiry => "property_inquiry",
            Self::PropertyRecommendation => "property_recommendation",
            Self::BudgetSharing => "budget_sharing",
            Self::PostInspectionFeedback => "post_inspection_feedback",
            Self::PaymentMethod => "payment_method",
            Self::GeneralQuery => "general_query",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone)]
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }

    pub async fn classify(&self, message: &str) -> Result<Intent, CompletionError> {
        let raw =
            self.prompts.complete(self.llm.as_ref(), PromptKind::IntentClassification, message).await?;
        Ok(Intent::from_label(&raw))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Intent, IntentClassifier};
    use crate::llm::ScriptedLlm;
    use crate::prompts::PromptLibrary;

    #[test]
    fn known_labels_round_trip() {
        for intent in [
            Intent::PropertyInquiry,
            Intent::PropertyRecommendation,
            Intent::BudgetSharing,
            Intent::PostInspectionFeedback,
            Intent::PaymentMethod,
            Intent::GeneralQuery,
        ] {
            assert_eq!(Intent::from_label(intent.label()), intent);
        }
    }

    #[test]
    fn labels_are_case_sensitive() {
        assert_eq!(
            Intent::from_label("Budget_Sharing"),
            Intent::Unrecognized("Budget_Sharing".to_string())
        );
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        assert_eq!(Intent::from_label("payment_method\n"), Intent::PaymentMethod);
    }

    #[tokio::test]
    async fn classifier_sends_rendered_prompt() {
        let llm = Arc::new(ScriptedLlm::new(["budget_sharing"]));
        let classifier = IntentClassifier::new(
            llm.clone(),
            Arc::new(PromptLibrary::new().expect("templates")),
        );

        let intent = classifier.classify("my budget is 200000").await.expect("classify");

        assert_eq!(intent, Intent::BudgetSharing);
        let prompts = llm.prompts().await;
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Customer message: my budget is 200000"));
    }

    #[tokio::test]
    async fn llm_failure_surfaces_as_error() {
        let llm = Arc::new(ScriptedLlm::default());
        llm.push_failure("timeout").await;
        let classifier =
            IntentClassifier::new(llm, Arc::new(PromptLibrary::new().expect("templates")));

        assert!(classifier.classify("hello").await.is_err());
    }
}
