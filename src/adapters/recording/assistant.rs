//! Recording adapter for the `Assistant` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::assistant::{Assistant, AssistantFuture, InvocationRequest};

/// Records assistant invocations while delegating to an inner implementation.
pub struct RecordingAssistant {
    inner: Box<dyn Assistant>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingAssistant {
    /// Creates a new recording assistant wrapping the given implementation.
    pub fn new(inner: Box<dyn Assistant>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl Assistant for RecordingAssistant {
    fn invoke(&self, request: &InvocationRequest) -> AssistantFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let result = self.inner.invoke(&request).await;
            record_result(&self.recorder, "assistant", "invoke", &request, &result);
            result
        })
    }
}
