//! Conversation side of the intake bot.
//!
//! Inbound WhatsApp messages are classified by a language model, routed to
//! one of five handlers and answered through the messaging gateway:
//! 1. **Classification** (`classifier`) - raw text to an [`classifier::Intent`]
//! 2. **Extraction** (`extraction`, `sentiment`) - structured fields and a
//!    sentiment label pulled from the same message
//! 3. **Routing** (`dialogue`) - customer bookkeeping, interaction log and the
//!    reply for the turn
//!
//! Listings enter through `listings`, which assigns identifiers and tells
//! the automation webhook about each new property.
//!
//! The model only labels and extracts. Recommendations, reply wording and
//! everything written to storage are decided here.

pub mod classifier;
pub mod dialogue;
pub mod extraction;
pub mod listings;
pub mod llm;
pub mod prompts;
pub mod sentiment;

pub use classifier::{Intent, IntentClassifier};
pub use dialogue::{DialogueError, DialogueRouter, Handler, Stores, TurnOutcome};
pub use extraction::{DetailExtractor, ExtractionError, InquiryDetails};
pub use listings::{
    HttpListingNotifier, ListingError, ListingNotifier, ListingService, NoopNotifier,
    RecordingNotifier,
};
pub use llm::{build_client, LlmClient, LlmError, ScriptedLlm};
pub use prompts::{PromptKind, PromptLibrary};
pub use sentiment::{Sentiment, SentimentExtractor};
