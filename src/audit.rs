//! Offline conversation auditing helpers.
//!
//! The batch greeting check reads every session's first turn and asks a
//! classifier whether the agent opened with the expected scripted phrase.
//! The classifier is a trait so an external LLM checker can sit behind it;
//! the bundled implementation is a local normalized exact matcher.

use async_trait::async_trait;

/// The greeting the agent is instructed to open every conversation with.
pub const EXPECTED_GREETING: &str = "I am here and ready to help";

/// Decides whether a first-turn response counts as the exact greeting.
#[async_trait]
pub trait GreetingClassifier: Send + Sync {
    async fn is_exact(&self, text: &str) -> anyhow::Result<bool>;
}

/// Punctuation- and whitespace-insensitive exact matcher.
pub struct ExactPhraseClassifier {
    expected: String,
}

impl ExactPhraseClassifier {
    pub fn new(expected: &str) -> Self {
        Self {
            expected: normalize(expected),
        }
    }
}

impl Default for ExactPhraseClassifier {
    fn default() -> Self {
        Self::new(EXPECTED_GREETING)
    }
}

#[async_trait]
impl GreetingClassifier for ExactPhraseClassifier {
    async fn is_exact(&self, text: &str) -> anyhow::Result<bool> {
        Ok(normalize(text) == self.expected)
    }
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tally of a batch greeting audit.
#[derive(Debug, Default, Clone)]
pub struct AuditReport {
    pub total: usize,
    pub exact: usize,
}

impl AuditReport {
    pub fn record(&mut self, exact: bool) {
        self.total += 1;
        if exact {
            self.exact += 1;
        }
    }

    pub fn percent_exact(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.exact as f64 / self.total as f64 * 100.0
        }
    }
}

/// Linear-interpolation percentile over a sorted slice, `percent` in [0, 1].
pub fn percentile(sorted: &[f64], percent: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let idx = percent * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let weight = idx - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exact_greeting_matches_despite_punctuation() -> anyhow::Result<()> {
        let classifier = ExactPhraseClassifier::default();
        assert!(classifier.is_exact("I am here and ready to help!").await?);
        assert!(classifier.is_exact("  i am here, and ready to help. ").await?);
        assert!(!classifier.is_exact("Hello! I am here and ready to help!").await?);
        assert!(!classifier.is_exact("").await?);
        Ok(())
    }

    #[test]
    fn report_percentage() {
        let mut report = AuditReport::default();
        report.record(true);
        report.record(true);
        report.record(false);
        assert_eq!(report.total, 3);
        assert!((report.percent_exact() - 66.666).abs() < 0.01);
        assert_eq!(AuditReport::default().percent_exact(), 0.0);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.5), Some(2.5));
        assert_eq!(percentile(&data, 0.0), Some(1.0));
        assert_eq!(percentile(&data, 1.0), Some(4.0));
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[7.0], 0.95), Some(7.0));
    }
}
