//! Shared data models.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Case payload submitted for analysis.
///
/// Only `case_id` and `evidence_items` are interpreted locally; every other
/// field is passed through to the verdict service untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseData {
    pub case_id: String,
    /// Absent stays absent on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_items: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CaseData {
    pub fn new(case_id: impl Into<String>, evidence_items: Vec<Value>) -> Self {
        Self {
            case_id: case_id.into(),
            evidence_items: Some(evidence_items),
            extra: Map::new(),
        }
    }

    /// Number of evidence items; a missing list counts as empty.
    pub fn evidence_count(&self) -> usize {
        self.evidence_items.as_ref().map_or(0, Vec::len)
    }
}

/// Verdict returned by the service or produced by the local fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictResult {
    pub case_id: String,
    pub verdict_summary: String,
    /// Between 0 and 1
    pub confidence_score: f64,
    #[serde(default)]
    pub reasoning: Vec<String>,
    pub precedents_referenced: u32,
    pub jurisdictions_applied: u32,
    pub quantum_analysis: QuantumAnalysis,
    #[serde(default)]
    pub audit_trail: AuditTrail,
    /// ISO-8601
    pub timestamp: String,
    pub verdict_token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantumAnalysis {
    pub quantum_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precedent_relevance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_probability: Option<f64>,
    /// Speedup over the classical path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantum_advantage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of an auth client operation.
///
/// Serializes as `{"success": true, "data": .., "message": ..}` or
/// `{"success": false, "error": .., "message": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthResult<T> {
    Success { data: T, message: Option<String> },
    Failure { error: String, message: String },
}

impl<T> AuthResult<T> {
    pub fn success(data: T) -> Self {
        AuthResult::Success { data, message: None }
    }

    pub fn success_with(data: T, message: impl Into<String>) -> Self {
        AuthResult::Success {
            data,
            message: Some(message.into()),
        }
    }

    /// Failure whose user-facing message is the error itself.
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        AuthResult::Failure {
            message: error.clone(),
            error,
        }
    }

    pub fn failure_with(error: impl Into<String>, message: impl Into<String>) -> Self {
        AuthResult::Failure {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            AuthResult::Success { data, .. } => Some(data),
            AuthResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AuthResult::Success { .. } => None,
            AuthResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AuthResult::Success { message, .. } => message.as_deref(),
            AuthResult::Failure { message, .. } => Some(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AuthResult<U> {
        match self {
            AuthResult::Success { data, message } => AuthResult::Success {
                data: f(data),
                message,
            },
            AuthResult::Failure { error, message } => AuthResult::Failure { error, message },
        }
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match self {
            AuthResult::Success { data, .. } => Ok(data),
            AuthResult::Failure { error, .. } => Err(error),
        }
    }
}

impl<T> From<crate::Result<T>> for AuthResult<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => AuthResult::success(data),
            Err(e) => AuthResult::failure(e.to_string()),
        }
    }
}

/// Wire shape of [`AuthResult`].
#[derive(Serialize)]
struct AuthResponse<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl<T: Serialize> Serialize for AuthResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        AuthResponse {
            success: self.is_success(),
            data: self.data(),
            error: self.error(),
            message: self.message(),
        }
        .serialize(serializer)
    }
}
