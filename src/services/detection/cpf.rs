// CPF detector
// Taxpayer numbers: pattern tiers, label context and mod-11 check digits

use super::dedup::dedupe_by_confidence;
use super::text_view::{compile, digits_only, ContextTable, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord};
use regex::Regex;
use std::sync::OnceLock;

const PATTERNS: &[(&str, f64)] = &[
    (r"\b(\d{3})[.\s]?(\d{3})[.\s]?(\d{3})[-.\s]?(\d{2})\b", 0.95),
    (r"\b(\d{11})\b", 0.70),
];

const CONTEXT: &[&str] = &[
    r"cpf[\s:]*",
    r"c\.?p\.?f\.?[\s:]*",
    r"cadastro[\s\w]*pessoa[\s\w]*física",
    r"documento[\s:]*",
    r"inscri[çc][aã]o[\s:]*",
];

const CONTEXT_WINDOW: usize = 30;

fn patterns() -> &'static [(Regex, f64)] {
    static RE: OnceLock<Vec<(Regex, f64)>> = OnceLock::new();
    RE.get_or_init(|| PATTERNS.iter().map(|(p, c)| (compile(p), *c)).collect())
}

fn context() -> &'static ContextTable {
    static TABLE: OnceLock<ContextTable> = OnceLock::new();
    TABLE.get_or_init(|| ContextTable::new(CONTEXT))
}

/// Repeated-digit runs and `01234567890` pass the check digits but are never real CPFs
pub fn is_denylisted(digits: &str) -> bool {
    let mut chars = digits.chars();
    let all_same = match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    };
    all_same || digits == "01234567890"
}

/// Two-step mod-11 check-digit verification of an 11-digit CPF
pub fn is_valid_cpf(number: &str) -> bool {
    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return false;
    }

    let check = |len: usize| -> u32 {
        let weight_start = len as u32 + 1;
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (weight_start - i as u32))
            .sum();
        let rest = (sum * 10) % 11;
        if rest == 10 {
            0
        } else {
            rest
        }
    };

    check(9) == digits[9] && check(10) == digits[10]
}

#[derive(Debug, Clone)]
pub struct CpfDetector {
    threshold: f64,
}

impl CpfDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detect for CpfDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        let view = TextView::new(text);
        let mut found = Vec::new();

        for (regex, base) in patterns() {
            for m in regex.find_iter(text) {
                let digits = digits_only(m.as_str());
                if digits.len() != 11 || is_denylisted(&digits) {
                    continue;
                }

                let mut confidence = *base;
                if context().matches(&view.before(m.start(), CONTEXT_WINDOW)) {
                    confidence = (confidence + 0.15).min(1.0);
                }

                let validated = is_valid_cpf(&digits);
                if validated {
                    confidence = (confidence + 0.10).min(1.0);
                } else {
                    confidence = (confidence - 0.20).max(0.3);
                }

                if confidence >= self.threshold {
                    found.push(view.record(
                        Category::Cpf,
                        m.start(),
                        m.end(),
                        confidence,
                        validated,
                        DetectionMethod::PatternValidation,
                    ));
                }
            }
        }

        dedupe_by_confidence(found)
    }
}
