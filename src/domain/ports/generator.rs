//! Generator port - interface to the model that drafts and repairs tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{EnrichedContext, ObservedFailure};

/// What a generator call is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTask {
    Plan,
    Generate,
    AnalyzeFailure,
    FixExecution,
    FixTypeErrors,
    FixLint,
    ExtractFailures,
    ExtractAccessibility,
}

impl GenerationTask {
    /// Role line sent with the request.
    pub const fn role(self) -> &'static str {
        match self {
            Self::Plan => "You plan the migration of a legacy UI test to a modern testing library.",
            Self::Generate => "You write the migrated test file following the plan.",
            Self::AnalyzeFailure => "You diagnose why one migrated test fails.",
            Self::FixExecution => "You repair a migrated test so the failing case passes.",
            Self::FixTypeErrors => "You repair type errors in a migrated test file.",
            Self::FixLint => "You repair lint violations in a migrated test file.",
            Self::ExtractFailures => "You extract failing tests from test runner output.",
            Self::ExtractAccessibility => {
                "You extract the rendered accessibility tree from test runner output."
            }
        }
    }

    /// JSON shape the response must match.
    pub const fn response_schema(self) -> &'static str {
        match self {
            Self::Plan => r#"{"plan": string}"#,
            Self::Generate => r#"{"content": string}"#,
            Self::AnalyzeFailure => r#"{"analysis": string}"#,
            Self::FixExecution | Self::FixTypeErrors | Self::FixLint => {
                r#"{"content": string, "explanation": string}"#
            }
            Self::ExtractFailures => {
                r#"{"failures": [{"test_name": string, "raw_message": string}]}"#
            }
            Self::ExtractAccessibility => r#"{"snapshot": string}"#,
        }
    }
}

impl fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        f.write_str(&s)
    }
}

/// Structured prompt payload for one generator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub task: GenerationTask,
    pub role: String,
    pub file_path: String,
    pub original_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_content: Option<String>,
    pub context: Arc<EnrichedContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility_context: Option<String>,
}

impl GenerationRequest {
    pub fn new(
        task: GenerationTask,
        file_path: impl Into<String>,
        original_content: impl Into<String>,
        context: Arc<EnrichedContext>,
    ) -> Self {
        Self {
            task,
            role: task.role().to_string(),
            file_path: file_path.into(),
            original_content: original_content.into(),
            candidate_content: None,
            context,
            plan: None,
            analysis: None,
            failure_details: None,
            accessibility_context: None,
        }
    }
}

/// `{"plan": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub plan: String,
}

/// `{"content": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub content: String,
}

/// `{"analysis": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

/// `{"content": ..., "explanation": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixResponse {
    pub content: String,
    #[serde(default)]
    pub explanation: String,
}

/// `{"failures": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureListResponse {
    pub failures: Vec<ObservedFailure>,
}

/// `{"snapshot": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityResponse {
    pub snapshot: String,
}

/// A model backend that answers [`GenerationRequest`]s.
///
/// Implementations return the raw response text. Decoding into the typed
/// response for the task happens in the node adapters, so schema violations
/// are handled in one place.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Send one request and return the raw response body.
    async fn generate(&self, request: GenerationRequest) -> DomainResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_display_is_snake_case() {
        assert_eq!(GenerationTask::FixTypeErrors.to_string(), "fix_type_errors");
        assert_eq!(GenerationTask::Plan.to_string(), "plan");
    }

    #[test]
    fn request_omits_empty_optionals() {
        let req = GenerationRequest::new(
            GenerationTask::Plan,
            "a.test.tsx",
            "x",
            Arc::new(EnrichedContext::named("A")),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("plan").is_none());
        assert_eq!(json["task"], "plan");
        assert_eq!(json["context"]["component_name"], "A");
    }

    #[test]
    fn fix_response_explanation_is_optional() {
        let r: FixResponse = serde_json::from_str(r#"{"content": "x"}"#).unwrap();
        assert_eq!(r.explanation, "");
    }
}
