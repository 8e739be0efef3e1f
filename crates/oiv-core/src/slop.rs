//! Slop detection: low-effort filler language in generated text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::PolicyWeights;

/// Severity of a slop phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlopSeverity {
    Low,
    Medium,
    High,
}

impl SlopSeverity {
    fn weight(self, weights: &PolicyWeights) -> f64 {
        match self {
            Self::High => weights.slop_high_weight,
            Self::Medium => weights.slop_medium_weight,
            Self::Low => weights.slop_low_weight,
        }
    }
}

/// A slop phrase found in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlopMatch {
    pub name: String,
    pub severity: SlopSeverity,
    pub count: usize,
}

/// Result of [`run_slop_test`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopTestResult {
    pub passed: bool,
    /// 0–100.
    pub slop_score: f64,
    pub patterns: Vec<SlopMatch>,
    pub recommendations: Vec<String>,
}

impl SlopTestResult {
    pub(crate) fn clean() -> Self {
        Self {
            passed: true,
            slop_score: 0.0,
            patterns: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

struct SlopRule {
    name: &'static str,
    severity: SlopSeverity,
    regex: Regex,
}

const SLOP_PHRASES: &[(&str, &str, SlopSeverity)] = &[
    (r"\bgreat question\b", "great question", SlopSeverity::High),
    (r"\bdelv(?:e|es|ed|ing)\b", "delve", SlopSeverity::High),
    (r"\bas an ai(?: language model)?\b", "as an ai", SlopSeverity::High),
    (r"\bi hope this helps\b", "i hope this helps", SlopSeverity::High),
    (r"\bin today'?s (?:fast-paced|digital|modern) world\b", "in today's world", SlopSeverity::High),
    (r"\bever-evolving landscape\b", "ever-evolving landscape", SlopSeverity::High),
    (r"\blet me\b", "let me", SlopSeverity::Medium),
    (r"\bit'?s (?:important|worth) (?:to note|noting)\b", "it's worth noting", SlopSeverity::Medium),
    (r"\b(?:rich )?tapestry\b", "tapestry", SlopSeverity::Medium),
    (r"\bdeep dive\b|\bdive deep\b", "deep dive", SlopSeverity::Medium),
    (r"\bnavigat(?:e|ing) the complexities\b", "navigate the complexities", SlopSeverity::Medium),
    (r"\bunlock(?:ing)? the (?:full )?potential\b", "unlock the potential", SlopSeverity::Medium),
    (r"\b(?:i'?m )?happy to help\b", "happy to help", SlopSeverity::Medium),
    (r"(?m)^\s*certainly[!,.]", "certainly", SlopSeverity::Medium),
    (r"\bfascinating\b", "fascinating", SlopSeverity::Low),
    (r"\babsolutely[!,.]", "absolutely", SlopSeverity::Low),
    (r"\bgame[- ]changer\b", "game changer", SlopSeverity::Low),
    (r"\bseamless(?:ly)?\b", "seamless", SlopSeverity::Low),
    (r"\bleverag(?:e|es|ed|ing)\b", "leverage", SlopSeverity::Low),
    (r"\brobust\b", "robust", SlopSeverity::Low),
    (r"\bfeel free to\b", "feel free to", SlopSeverity::Low),
    (r"\bin conclusion\b", "in conclusion", SlopSeverity::Low),
];

fn slop_table() -> &'static [SlopRule] {
    static TABLE: OnceLock<Vec<SlopRule>> = OnceLock::new();
    TABLE.get_or_init(|| {
        SLOP_PHRASES
            .iter()
            .filter_map(|&(pattern, name, severity)| {
                match Regex::new(&format!("(?i){pattern}")) {
                    Ok(regex) => Some(SlopRule {
                        name,
                        severity,
                        regex,
                    }),
                    Err(e) => {
                        error!(pattern = name, error = %e, "slop pattern failed to compile; skipped");
                        None
                    }
                }
            })
            .collect()
    })
}

/// Score `text` for filler language.
///
/// Each phrase contributes `matches × severity weight`; the total is
/// normalized by word count, scaled by 1000 and capped at 100.
pub fn run_slop_test(text: &str, weights: &PolicyWeights) -> SlopTestResult {
    let word_count = text.split_whitespace().count();
    if word_count == 0 {
        return SlopTestResult::clean();
    }

    let mut total = 0.0;
    let mut patterns = Vec::new();
    for rule in slop_table() {
        let count = rule.regex.find_iter(text).count();
        if count > 0 {
            total += count as f64 * rule.severity.weight(weights);
            patterns.push(SlopMatch {
                name: rule.name.to_string(),
                severity: rule.severity,
                count,
            });
        }
    }

    let slop_score = (total / word_count as f64 * 1000.0).min(100.0);
    let threshold = weights.slop_pass_threshold;

    let mut recommendations: Vec<String> = patterns
        .iter()
        .filter(|p| p.severity == SlopSeverity::High)
        .map(|p| format!("Remove high-severity filler phrase: \"{}\"", p.name))
        .collect();
    if slop_score >= threshold {
        recommendations.push(format!(
            "Rewrite for directness: slop score {slop_score:.1} exceeds {threshold:.0}"
        ));
    } else if slop_score > 0.0 {
        recommendations.push("Minor filler detected; consider tightening the wording".to_string());
    }

    SlopTestResult {
        passed: slop_score < threshold,
        slop_score,
        patterns,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_compiles() {
        assert_eq!(slop_table().len(), SLOP_PHRASES.len());
    }

    #[test]
    fn empty_text_is_clean() {
        let result = run_slop_test("   ", &PolicyWeights::default());
        assert!(result.passed);
        assert_eq!(result.slop_score, 0.0);
    }

    #[test]
    fn matching_is_case_insensitive_and_counted() {
        let text = "Leverage the API. We leverage caching and LEVERAGED indexes across a long technical document \
                    that keeps going for a while so the score stays moderate in size overall here today.";
        let result = run_slop_test(text, &PolicyWeights::default());
        let leverage = result
            .patterns
            .iter()
            .find(|p| p.name == "leverage")
            .expect("leverage matched");
        assert_eq!(leverage.count, 3);
        assert_eq!(leverage.severity, SlopSeverity::Low);
    }

    #[test]
    fn score_is_capped() {
        let text = "Great question! Great question! Delve.";
        let result = run_slop_test(text, &PolicyWeights::default());
        assert_eq!(result.slop_score, 100.0);
        assert!(!result.passed);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("great question")));
    }

    #[test]
    fn light_filler_passes_with_note() {
        let words = vec!["word"; 199].join(" ");
        let text = format!("{words} robust");
        let result = run_slop_test(&text, &PolicyWeights::default());
        // 1 low hit over 200 words: 1/200*1000 = 5
        assert!((result.slop_score - 5.0).abs() < 1e-9);
        assert!(result.passed);
        assert_eq!(result.recommendations.len(), 1);
    }
}
