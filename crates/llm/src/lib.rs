//! LLM access for bookly.
//!
//! The model is strictly a translator: it turns free text into candidate
//! booking fields and nothing else. Unusable model output degrades to
//! `Extraction::Unparsable` ("no new information"), never a hard error.

pub mod extraction;
pub mod provider;

pub use extraction::{parse_extraction, ExtractedFields, Extraction};
pub use provider::{HttpLlmClient, LlmClient, LlmError};
