// RG detector
// State identity numbers; the bare-digit tier leans heavily on surrounding words

use super::dedup::dedupe_by_confidence;
use super::text_view::{compile, digits_only, ContextTable, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord};
use regex::Regex;
use std::sync::OnceLock;

const PATTERNS: &[(&str, f64)] = &[
    (r"\b(\d{1,2})[.\s]?(\d{3})[.\s]?(\d{3})[-.\s]?([0-9xX])\b", 0.85),
    (r"(?i)\b(\d{7,9})[\s/-]*(ssp|sds|detran|pc|iml|igp)[/\s]*([a-z]{2})\b", 0.95),
    (r"\b(\d{7,9})\b", 0.50),
];

const POSITIVE_CONTEXT: &[&str] = &[
    r"r\.?g\.?[\s:]*",
    r"registro[\s\w]*geral",
    r"identidade[\s:]*",
    r"documento[\s:]*",
    r"carteira[\s:]*",
    r"cédula[\s:]*",
];

const NEGATIVE_CONTEXT: &[&str] = &[
    r"processo",
    r"sei[\s:]*",
    r"protocolo",
    r"n[úu]mero[\s\w]*pedido",
    r"c[óo]digo",
    r"refer[êe]ncia",
    r"ano",
    r"data",
    r"cep",
];

const CONTEXT_WINDOW: usize = 40;

fn patterns() -> &'static [(Regex, f64)] {
    static RE: OnceLock<Vec<(Regex, f64)>> = OnceLock::new();
    RE.get_or_init(|| PATTERNS.iter().map(|(p, c)| (compile(p), *c)).collect())
}

fn positive_context() -> &'static ContextTable {
    static TABLE: OnceLock<ContextTable> = OnceLock::new();
    TABLE.get_or_init(|| ContextTable::new(POSITIVE_CONTEXT))
}

fn negative_context() -> &'static ContextTable {
    static TABLE: OnceLock<ContextTable> = OnceLock::new();
    TABLE.get_or_init(|| ContextTable::new(NEGATIVE_CONTEXT))
}

#[derive(Debug, Clone)]
pub struct RgDetector {
    threshold: f64,
}

impl RgDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detect for RgDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        let view = TextView::new(text);
        let mut found = Vec::new();

        for (regex, base) in patterns() {
            for m in regex.find_iter(text) {
                let count = digits_only(m.as_str()).len();
                if !(7..=9).contains(&count) {
                    continue;
                }

                let window = view.around(m.start(), m.end(), CONTEXT_WINDOW, CONTEXT_WINDOW);
                let mut confidence = *base;
                if positive_context().matches(&window) {
                    confidence = (confidence + 0.20).min(1.0);
                }
                if negative_context().matches(&window) {
                    confidence = (confidence - 0.25).max(0.2);
                }

                if confidence >= self.threshold {
                    found.push(view.record(
                        Category::Rg,
                        m.start(),
                        m.end(),
                        confidence,
                        false,
                        DetectionMethod::PatternContext,
                    ));
                }
            }
        }

        dedupe_by_confidence(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_letter_is_not_counted() {
        let records = RgDetector::new(0.75).detect("RG 1.234.567-X");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value, "1.234.567-X");
    }

    #[test]
    fn test_labeled_punctuated_rg() {
        let records = RgDetector::new(0.75).detect("Meu RG: 12.345.678-9 para cadastro");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value, "12.345.678-9");
        assert_eq!(records[0].confidence, 1.0);
        assert!(!records[0].validated);
    }

    #[test]
    fn test_issuing_agency_form() {
        let records = RgDetector::new(0.75).detect("portador do 1234567 SSP/DF");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value, "1234567 SSP/DF");
        assert_eq!(records[0].confidence, 0.95);
    }

    #[test]
    fn test_bare_digits_need_context() {
        let detector = RgDetector::new(0.75);
        assert!(detector.detect("valor 1234567 registrado").is_empty());
        let records = detector.detect("identidade 1234567");
        assert!(records.is_empty(), "0.50 + 0.20 stays under 0.75");

        let permissive = RgDetector::new(0.5);
        assert_eq!(permissive.detect("identidade 1234567")[0].confidence, 0.7);
    }

    #[test]
    fn test_negative_context_suppresses() {
        let detector = RgDetector::new(0.75);
        assert!(detector.detect("processo 12.345.678-9").is_empty());
        assert!(detector.detect("código 12.345.678-9").is_empty());
    }
}
