//! Metrics extraction — pure functions from raw answers to a score summary.
//!
//! No I/O, no errors: malformed or out-of-range values are clamped or
//! ignored, never rejected. A submission with no rating questions simply
//! yields an empty [`Metrics`].

use crate::model::{Answer, FieldDefinition, FieldType, Metrics};
use std::collections::HashMap;

/// NPS respondent classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpsBand {
    /// Score 9–10.
    Promoter,
    /// Score 7–8.
    Passive,
    /// Score 0–6.
    Detractor,
}

/// Extract NPS/CSAT scores from answers against the form's field-type schema.
///
/// Builds a question-id → field-type lookup and walks the answers in order.
/// NPS values clamp to [0, 10], CSAT values clamp to [1, 5]. If a schema
/// improperly declares the same type twice, the last matching answer wins.
/// Answers with no schema match, a non-rating type, or a non-numeric value
/// contribute nothing.
pub fn extract_metrics(answers: &[Answer], schema: &[FieldDefinition]) -> Metrics {
    let field_types: HashMap<&str, FieldType> = schema
        .iter()
        .map(|f| (f.id.as_str(), f.field_type))
        .collect();

    let mut metrics = Metrics::default();

    for answer in answers {
        let Some(field_type) = field_types.get(answer.question_id.as_str()) else {
            continue;
        };
        let Some(value) = answer.value.as_f64() else {
            continue;
        };

        match field_type {
            FieldType::Nps => metrics.nps_score = Some(clamp_score(value, 0, 10)),
            FieldType::Csat => metrics.csat_score = Some(clamp_score(value, 1, 5)),
            _ => {}
        }
    }

    metrics
}

fn clamp_score(value: f64, min: i32, max: i32) -> i32 {
    (value.round() as i64).clamp(min as i64, max as i64) as i32
}

/// Classify an NPS score into its band. Total over all inputs.
pub fn classify(nps_score: i32) -> NpsBand {
    if nps_score >= 9 {
        NpsBand::Promoter
    } else if nps_score >= 7 {
        NpsBand::Passive
    } else {
        NpsBand::Detractor
    }
}

/// Whether a response should trigger an owner alert.
///
/// Strict less-than; a missing score never triggers.
pub fn should_trigger_alert(nps_score: Option<i32>, threshold: i32) -> bool {
    match nps_score {
        Some(score) => score < threshold,
        None => false,
    }
}
