pub mod client;
pub mod extract;

pub use client::{Completion, LlmClient, LlmError, OpenAiClient};
