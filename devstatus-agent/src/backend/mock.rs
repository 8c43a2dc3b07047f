//! In-process backend with a fixed reply.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{CompletionBackend, CompletionRequest, CompletionResponse, LlmError};

/// Replies with the same content every time and remembers what it was asked.
pub struct MockBackend {
    id: String,
    reply: String,
    online: AtomicBool,
    calls: AtomicU32,
    seen: Mutex<Option<CompletionRequest>>,
}

impl MockBackend {
    /// Starts online with an empty-list reply.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reply: "[]".to_string(),
            online: AtomicBool::new(true),
            calls: AtomicU32::new(0),
            seen: Mutex::new(None),
        }
    }

    pub fn with_response(self, reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..self
        }
    }

    /// An offline backend fails every call with [`LlmError::Unavailable`].
    pub fn with_available(self, online: bool) -> Self {
        self.online.store(online, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.seen.lock().ok().and_then(|seen| seen.clone())
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            *seen = Some(request);
        }

        if !self.online.load(Ordering::SeqCst) {
            return Err(LlmError::Unavailable(format!("{} is offline", self.id)));
        }
        Ok(CompletionResponse::new(self.reply.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_and_recorded_prompt() {
        let backend = MockBackend::new("mock").with_response("[{\"slug\": \"x\"}]");
        assert_eq!(backend.call_count(), 0);

        let response = backend
            .complete(CompletionRequest::user("package.json"))
            .await
            .unwrap();

        assert_eq!(response.content, "[{\"slug\": \"x\"}]");
        assert!(!response.truncated);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.last_request().unwrap().prompt, "package.json");
    }

    #[tokio::test]
    async fn test_offline_still_counts_calls() {
        let backend = MockBackend::new("mock").with_available(false);
        let result = backend.complete(CompletionRequest::user("x")).await;
        assert!(matches!(result, Err(LlmError::Unavailable(_))));
        assert_eq!(backend.call_count(), 1);
    }
}
