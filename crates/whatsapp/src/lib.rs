//! WhatsApp Cloud API integration
//!
//! - **Webhook** (`webhook`) - inbound event envelope parsing
//! - **Signature** (`signature`) - `X-Hub-Signature-256` payload check
//! - **Sender** (`sender`) - outbound text, image and template messages
//!
//! ```text
//! Meta webhook POST → parse_envelope → InboundMessage → DialogueRouter
//!                                                          ↓
//!                          Graph API /messages ← MessageSender
//! ```

pub mod sender;
pub mod signature;
pub mod webhook;

pub use sender::{CloudApiSender, MessageSender, OutboundMessage, RecordingSender, SendError};
pub use signature::{sign, tokens_match, verify_signature, SIGNATURE_HEADER};
pub use webhook::{parse_envelope, EnvelopeError, InboundMessage};
