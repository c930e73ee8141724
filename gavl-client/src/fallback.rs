//! Rule-based verdict used when the verdict service cannot be reached.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Map;

use crate::models::{AuditTrail, CaseData, QuantumAnalysis, VerdictResult};
use crate::token::make_token_at;

/// Audit method recorded on locally generated verdicts.
pub const FALLBACK_METHOD: &str = "simulated_fallback";

const PRECEDENTS_REFERENCED: u32 = 47;
const JURISDICTIONS_APPLIED: u32 = 3;

/// Confidence bucket selected by the number of evidence items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceBucket {
    /// Three or more items
    Comprehensive,
    /// One or two items
    Moderate,
    /// No evidence
    Insufficient,
}

impl EvidenceBucket {
    pub fn for_count(count: usize) -> Self {
        match count {
            0 => EvidenceBucket::Insufficient,
            1 | 2 => EvidenceBucket::Moderate,
            _ => EvidenceBucket::Comprehensive,
        }
    }

    pub fn confidence(self) -> f64 {
        match self {
            EvidenceBucket::Comprehensive => 0.94,
            EvidenceBucket::Moderate => 0.72,
            EvidenceBucket::Insufficient => 0.45,
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            EvidenceBucket::Comprehensive => {
                "Based on comprehensive evidence analysis, the algorithmic court renders a high-confidence determination."
            }
            EvidenceBucket::Moderate => {
                "The case has moderate evidentiary support. Additional documentation may strengthen the determination."
            }
            EvidenceBucket::Insufficient => {
                "Insufficient evidence provided for a conclusive algorithmic determination."
            }
        }
    }
}

/// Generate a fallback verdict stamped with the current time.
pub fn simulated_verdict(case: &CaseData) -> VerdictResult {
    simulated_verdict_at(case, Utc::now())
}

/// Generate a fallback verdict as of `now`.
pub fn simulated_verdict_at(case: &CaseData, now: DateTime<Utc>) -> VerdictResult {
    let evidence_count = case.evidence_count();
    let bucket = EvidenceBucket::for_count(evidence_count);
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    VerdictResult {
        case_id: case.case_id.clone(),
        verdict_summary: bucket.summary().to_string(),
        confidence_score: bucket.confidence(),
        reasoning: vec![
            format!("Evidence items analyzed: {}", evidence_count),
            "Classical analysis performed (quantum backend unavailable)".to_string(),
            "Verdict generated using rule-based inference".to_string(),
        ],
        precedents_referenced: PRECEDENTS_REFERENCED,
        jurisdictions_applied: JURISDICTIONS_APPLIED,
        quantum_analysis: QuantumAnalysis {
            quantum_available: false,
            note: Some("Quantum ML backend unavailable - using classical fallback".to_string()),
            ..QuantumAnalysis::default()
        },
        audit_trail: AuditTrail {
            method: Some(FALLBACK_METHOD.to_string()),
            timestamp: Some(timestamp.clone()),
            extra: Map::new(),
        },
        timestamp,
        verdict_token: make_token_at(&case.case_id, now.timestamp_millis()),
        extra: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn case_with(count: usize) -> CaseData {
        CaseData::new("C1", (0..count).map(|i| json!({"id": i})).collect())
    }

    #[test]
    fn test_confidence_buckets() {
        for n in 0..10 {
            let verdict = simulated_verdict(&case_with(n));
            let expected = match n {
                0 => 0.45,
                1 | 2 => 0.72,
                _ => 0.94,
            };
            assert_eq!(verdict.confidence_score, expected, "evidence count {n}");
            assert!(!verdict.quantum_analysis.quantum_available);
        }
    }

    #[test]
    fn test_fallback_record() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let verdict = simulated_verdict_at(&case_with(2), now);

        assert_eq!(verdict.case_id, "C1");
        assert_eq!(verdict.reasoning[0], "Evidence items analyzed: 2");
        assert_eq!(verdict.reasoning.len(), 3);
        assert_eq!(verdict.precedents_referenced, 47);
        assert_eq!(verdict.jurisdictions_applied, 3);
        assert_eq!(verdict.timestamp, "2025-03-01T12:00:00.000Z");
        assert_eq!(verdict.audit_trail.method.as_deref(), Some(FALLBACK_METHOD));
        assert_eq!(verdict.audit_trail.timestamp.as_deref(), Some("2025-03-01T12:00:00.000Z"));
        assert_eq!(
            verdict.verdict_token,
            make_token_at("C1", now.timestamp_millis())
        );
        assert!(verdict.verdict_summary.starts_with("The case has moderate"));
    }

    #[test]
    fn test_fallback_serializes_without_quantum_scores() {
        let verdict = simulated_verdict(&case_with(0));
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(
            value["quantum_analysis"],
            json!({
                "quantum_available": false,
                "note": "Quantum ML backend unavailable - using classical fallback"
            })
        );
    }
}
