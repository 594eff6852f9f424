//! Mock provider implementation for testing.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Empty,
    Error(ProviderError),
    Delay(Duration, String),
    Panic,
}

/// Mock text provider for testing.
///
/// Replies are served in order; the last one repeats once the script runs out.
pub struct MockTextProvider {
    replies: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockTextProvider {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Always answer with the same text.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(vec![MockReply::Text(text.into())])
    }

    /// Always fail with the same error.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![MockReply::Error(error)])
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The prompt passed to the most recent `generate` call.
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_reply(&self) -> MockReply {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        if replies.len() > 1 {
            replies.pop_front().unwrap_or(MockReply::Empty)
        } else {
            replies.front().cloned().unwrap_or(MockReply::Empty)
        }
    }
}

fn text_response(text: Option<String>) -> ProviderResponse {
    ProviderResponse {
        output_tokens: text.as_ref().map(|t| t.len() as i32 / 4).unwrap_or(0),
        text,
        input_tokens: 0,
        finish_reason: FinishReason::Complete,
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap_or_else(|e| e.into_inner()) = Some(prompt.to_string());

        match self.next_reply() {
            MockReply::Text(text) => Ok(text_response(Some(text))),
            MockReply::Empty => Ok(text_response(None)),
            MockReply::Error(err) => Err(err),
            MockReply::Delay(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text_response(Some(text)))
            }
            MockReply::Panic => panic!("mock provider panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_repeats_last() {
        let provider = MockTextProvider::new(vec![
            MockReply::Error(ProviderError::RateLimited),
            MockReply::Text("done".into()),
        ]);
        let params = GenerationParams::default();

        assert!(provider.generate("a", &params).await.is_err());
        let second = provider.generate("b", &params).await.unwrap();
        let third = provider.generate("c", &params).await.unwrap();

        assert_eq!(second.text.as_deref(), Some("done"));
        assert_eq!(third.text.as_deref(), Some("done"));
        assert_eq!(provider.calls(), 3);
        assert_eq!(provider.last_prompt().as_deref(), Some("c"));
    }
}
