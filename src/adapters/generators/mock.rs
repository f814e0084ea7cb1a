//! Mock generator for testing.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{GenerationRequest, GenerationTask, Generator};

/// One scripted generator reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Raw response body.
    Body(String),
    /// Simulated transport failure.
    Fail(String),
}

impl MockResponse {
    pub fn body(raw: impl Into<String>) -> Self {
        Self::Body(raw.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    pub fn plan(plan: &str) -> Self {
        Self::Body(json!({ "plan": plan }).to_string())
    }

    pub fn candidate(content: &str) -> Self {
        Self::Body(json!({ "content": content }).to_string())
    }

    pub fn fix(content: &str) -> Self {
        Self::Body(json!({ "content": content, "explanation": "mock fix" }).to_string())
    }

    pub fn analysis(text: &str) -> Self {
        Self::Body(json!({ "analysis": text }).to_string())
    }

    pub fn failures(list: &[(&str, &str)]) -> Self {
        let failures: Vec<_> = list
            .iter()
            .map(|(name, msg)| json!({ "test_name": name, "raw_message": msg }))
            .collect();
        Self::Body(json!({ "failures": failures }).to_string())
    }

    pub fn snapshot(tree: &str) -> Self {
        Self::Body(json!({ "snapshot": tree }).to_string())
    }

    /// Reply used when nothing is scripted for a task.
    fn default_for(task: GenerationTask) -> Self {
        match task {
            GenerationTask::Plan => Self::plan("mock plan"),
            GenerationTask::Generate => Self::candidate("// migrated by mock"),
            GenerationTask::AnalyzeFailure => Self::analysis("mock analysis"),
            GenerationTask::FixExecution | GenerationTask::FixTypeErrors | GenerationTask::FixLint => {
                Self::fix("// fixed by mock")
            }
            GenerationTask::ExtractFailures => Self::failures(&[]),
            GenerationTask::ExtractAccessibility => Self::snapshot(""),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<GenerationTask, VecDeque<MockResponse>>,
    fallback: HashMap<GenerationTask, MockResponse>,
    requests: Vec<GenerationRequest>,
}

/// Generator that replays scripted responses per task.
///
/// Queued responses are consumed in order; once a task's queue is empty its
/// fallback (or a built-in default) is returned on every call.
#[derive(Debug, Default)]
pub struct MockGenerator {
    script: Mutex<Script>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for the next call of `task`.
    #[must_use]
    pub fn with_response(self, task: GenerationTask, response: MockResponse) -> Self {
        self.push(task, response);
        self
    }

    /// Reply with `response` whenever `task` has nothing queued.
    #[must_use]
    pub fn with_fallback(self, task: GenerationTask, response: MockResponse) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.fallback.insert(task, response);
        }
        self
    }

    pub fn push(&self, task: GenerationTask, response: MockResponse) {
        if let Ok(mut script) = self.script.lock() {
            script.queued.entry(task).or_default().push_back(response);
        }
    }

    /// Number of calls made for `task`.
    pub fn calls(&self, task: GenerationTask) -> usize {
        self.script
            .lock()
            .map(|s| s.requests.iter().filter(|r| r.task == task).count())
            .unwrap_or_default()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.script
            .lock()
            .map(|s| s.requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> DomainResult<String> {
        let task = request.task;
        let response = {
            let mut script = self
                .script
                .lock()
                .map_err(|_| DomainError::GeneratorFailed("mock script poisoned".to_string()))?;
            script.requests.push(request);
            let queued = script.queued.get_mut(&task).and_then(VecDeque::pop_front);
            queued
                .or_else(|| script.fallback.get(&task).cloned())
                .unwrap_or_else(|| MockResponse::default_for(task))
        };

        match response {
            MockResponse::Body(raw) => Ok(raw),
            MockResponse::Fail(message) => Err(DomainError::GeneratorFailed(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EnrichedContext;
    use std::sync::Arc;

    fn request(task: GenerationTask) -> GenerationRequest {
        GenerationRequest::new(task, "a.test.tsx", "x", Arc::new(EnrichedContext::named("A")))
    }

    #[tokio::test]
    async fn queued_then_fallback() {
        let mock = MockGenerator::new()
            .with_response(GenerationTask::Generate, MockResponse::failure("boom"))
            .with_fallback(GenerationTask::Generate, MockResponse::candidate("v2"));

        assert!(mock.generate(request(GenerationTask::Generate)).await.is_err());
        let raw = mock.generate(request(GenerationTask::Generate)).await.unwrap();
        assert!(raw.contains("v2"));
        assert_eq!(mock.calls(GenerationTask::Generate), 2);
        assert_eq!(mock.calls(GenerationTask::Plan), 0);
    }

    #[tokio::test]
    async fn defaults_decode_for_every_task() {
        let mock = MockGenerator::new();
        let raw = mock.generate(request(GenerationTask::Plan)).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["plan"], "mock plan");
    }
}
