//! Completion backend abstraction.
//!
//! The completion analyzer talks to an external text/code classification
//! service through the [`CompletionBackend`] trait:
//! - OpenAI-compatible chat completions (vLLM, Ollama, hosted APIs)
//! - Mock backend for testing

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockBackend;
pub use openai::OpenAiBackend;
pub use traits::{CompletionBackend, CompletionRequest, CompletionResponse, LlmError};
