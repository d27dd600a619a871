//! Rule evaluation: hard AND gate with weakest-link scoring.

use crate::confidence::clamp01;
use crate::kb::Rule;

use super::ConfidenceMap;

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub fires: bool,
    pub score: f64,
}

impl Evaluation {
    const NOT_FIRED: Self = Self {
        fires: false,
        score: 0.0,
    };
}

/// Decide whether `rule` fires against `confidences` and compute its score.
///
/// Every condition must have positive confidence (absent concepts count as
/// `0.0`). The score is the weakest condition's confidence times the rule's
/// certainty factor.
pub fn evaluate(rule: &Rule, confidences: &ConfidenceMap) -> Evaluation {
    if rule.conditions.is_empty() {
        return Evaluation::NOT_FIRED;
    }

    let mut base = f64::INFINITY;
    for condition in &rule.conditions {
        let c = clamp01(confidences.get(condition).copied().unwrap_or(0.0));
        if c <= 0.0 {
            return Evaluation::NOT_FIRED;
        }
        base = base.min(c);
    }

    Evaluation {
        fires: true,
        score: base * rule.certainty_factor(),
    }
}
