//! Human-readable rendering of verdicts.

use std::fmt::Display;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::models::{QuantumAnalysis, VerdictResult};

const CLOSING_STATEMENT: &str = "The algorithmic court renders its decision based on algorithmic objectivity, transparency, and adherence to legal principles.";
const AUDIT_STATEMENT: &str =
    "\nAll reasoning, precedents, and decision pathways are available in the complete audit trail.";
const END_OF_TRANSMISSION: &str = "\n\n--- END TRANSMISSION FROM THE ALGORITHMIC DIMENSION ---";

/// Render a verdict report using the local time zone.
pub fn format_verdict(verdict: &VerdictResult) -> String {
    format_verdict_in(verdict, &Local)
}

/// Render a verdict report with the rendering timestamp shown in `tz`.
pub fn format_verdict_in<Tz>(verdict: &VerdictResult, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let quantum = &verdict.quantum_analysis;
    let mut lines: Vec<String> = Vec::new();

    lines.push("ANALYZING EVIDENCE...\n".to_string());
    lines.push(format!(
        "The GAVL algorithmic court has processed all submitted evidence through {} Bayesian inference.\n",
        if quantum.quantum_available { "quantum-enhanced" } else { "classical" }
    ));

    lines.push("CASE ANALYSIS:".to_string());
    let processed = match verdict.reasoning.len() {
        0 => "N/A".to_string(),
        n => n.to_string(),
    };
    lines.push(format!("• Evidence items processed: {}", processed));
    lines.push(format!("• Legal precedents referenced: {}", verdict.precedents_referenced));
    lines.push(format!("• Jurisdictional frameworks applied: {}", verdict.jurisdictions_applied));
    lines.push(format!("• Confidence score: {}\n", percent(Some(verdict.confidence_score))));

    if quantum.quantum_available {
        push_quantum_block(&mut lines, quantum);
    }

    lines.push("\nFINDINGS:\n".to_string());
    lines.push(format!("{}\n", verdict.verdict_summary));

    lines.push("\nREASONING:\n".to_string());
    for (index, reason) in verdict.reasoning.iter().enumerate() {
        lines.push(format!("{}. {}", index + 1, reason));
    }

    lines.push("\n\nVERDICT:\n".to_string());
    lines.push(CLOSING_STATEMENT.to_string());
    lines.push(AUDIT_STATEMENT.to_string());

    lines.push(format!("\n\nVERDICT TOKEN: {}", verdict.verdict_token));
    lines.push(format!("VERDICT RENDERED: {}", localize(&verdict.timestamp, tz)));

    lines.push(END_OF_TRANSMISSION.to_string());

    lines.join("\n")
}

fn push_quantum_block(lines: &mut Vec<String>, quantum: &QuantumAnalysis) {
    lines.push("QUANTUM ML ANALYSIS:".to_string());
    lines.push(format!("• Evidence Confidence: {}", percent(quantum.evidence_confidence)));
    lines.push(format!("• Precedent Relevance: {}", percent(quantum.precedent_relevance)));
    lines.push(format!("• Outcome Probability: {}", percent(quantum.outcome_probability)));

    if let Some(advantage) = quantum.quantum_advantage.filter(|a| *a > 1.0) {
        lines.push(format!(
            "• Quantum Speedup: {:.1}x faster than classical\n",
            advantage
        ));
    }
}

fn percent(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{:.1}%", score * 100.0),
        None => "N/A".to_string(),
    }
}

/// `M/D/YYYY, h:mm:ss AM` in `tz`, or `Invalid Date`.
fn localize<Tz>(timestamp: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let parsed = DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(tz))
        .ok()
        .or_else(|| {
            // Offset-less timestamps are wall-clock time in `tz`.
            NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        });

    match parsed {
        Some(dt) => dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        None => "Invalid Date".to_string(),
    }
}
