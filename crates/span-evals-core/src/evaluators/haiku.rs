//! Rule-based 5-7-5 haiku structure check.
//!
//! Syllables are approximated by counting vowel clusters with a handful of
//! English fixups. The counter is a heuristic: downstream scores depend on its
//! exact output, not on linguistic accuracy, so changes here change results.

use async_trait::async_trait;
use serde_json::json;

use super::{EvalContext, Evaluator};
use crate::domain::{EvaluatorKind, Judgment};

/// Judgment name emitted by [`HaikuStructureEvaluator`].
pub const HAIKU_STRUCTURE: &str = "haiku_structure";

/// Expected per-line syllable counts.
pub const HAIKU_PATTERN: [u32; 3] = [5, 7, 5];

/// Irregular words whose count is taken verbatim.
const SYLLABLE_EXCEPTIONS: &[(&str, u32)] = &[
    ("the", 1),
    ("fire", 2),
    ("quiet", 2),
    ("hour", 2),
    ("breeze", 1),
    ("leaves", 1),
    ("dance", 1),
    ("embrace", 2),
];

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Approximate syllable count of a single word. Always at least 1.
pub fn count_syllables(word: &str) -> u32 {
    let lower = word.to_lowercase();

    if let Some((_, n)) = SYLLABLE_EXCEPTIONS.iter().find(|(w, _)| *w == lower) {
        return *n;
    }

    let stem = lower.strip_suffix('e').unwrap_or(&lower);

    let mut count = 0u32;
    let mut prev_vowel = false;
    for c in stem.chars() {
        let vowel = is_vowel(c);
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }

    let chars: Vec<char> = lower.chars().collect();
    let len = chars.len();
    if lower.ends_with("le") && len > 2 {
        // syllabic "le" as in "apple"
        if !is_vowel(chars[len - 3]) {
            count = count.max(1);
        }
    } else if lower.ends_with('e') && count == 0 {
        count = 1;
    }

    count.max(1)
}

/// Syllables in one line: commas and periods removed, words split on whitespace.
pub fn line_syllables(line: &str) -> u32 {
    let cleaned: String = line.chars().filter(|c| !matches!(c, ',' | '.')).collect();
    cleaned.split_whitespace().map(count_syllables).sum()
}

/// Per-line breakdown of a candidate haiku.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaikuAnalysis {
    /// Non-empty lines, trimmed.
    pub lines: Vec<String>,
    pub syllables: Vec<u32>,
}

impl HaikuAnalysis {
    pub fn of(text: &str) -> Self {
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        let syllables = lines.iter().map(|l| line_syllables(l)).collect();
        Self { lines, syllables }
    }

    /// Exactly three lines counting 5, 7 and 5.
    pub fn is_valid(&self) -> bool {
        self.lines.len() == HAIKU_PATTERN.len() && self.syllables == HAIKU_PATTERN
    }

    /// Counts joined by hyphens, e.g. `5-7-5`.
    pub fn pattern(&self) -> String {
        if self.syllables.is_empty() {
            return "none".to_string();
        }
        self.syllables
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Validates 5-7-5 haiku structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaikuStructureEvaluator;

impl HaikuStructureEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Score `text` as a haiku. Deterministic: equal input, equal judgment.
    pub fn judge(&self, text: &str) -> Judgment {
        let analysis = HaikuAnalysis::of(text);
        let valid = analysis.is_valid();

        let explanation = format!(
            "Syllable pattern {} across {} line(s), expected 5-7-5 across 3 lines",
            analysis.pattern(),
            analysis.lines.len()
        );

        Judgment::scored(
            HAIKU_STRUCTURE,
            if valid { 1.0 } else { 0.0 },
            explanation,
            EvaluatorKind::Rule,
        )
        .with_label(if valid { "valid" } else { "invalid" })
        .with_metadata("eval_type", "structure")
        .with_metadata("line_count", analysis.lines.len())
        .with_metadata("lines", json!(analysis.lines))
        .with_metadata("syllables", json!(analysis.syllables))
    }
}

#[async_trait]
impl Evaluator for HaikuStructureEvaluator {
    fn name(&self) -> &'static str {
        HAIKU_STRUCTURE
    }

    async fn evaluate(&self, text: &str, _context: &EvalContext) -> Vec<Judgment> {
        vec![self.judge(text)]
    }
}
