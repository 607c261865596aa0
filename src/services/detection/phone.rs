// Phone detector
// Brazilian landline and mobile numbers with area-code (DDD) validation

use super::cpf::is_valid_cpf;
use super::dedup::dedupe_by_confidence;
use super::text_view::{compile, digits_only, ContextTable, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord};
use regex::Regex;
use std::sync::OnceLock;

const PATTERNS: &[(&str, f64)] = &[
    (r"\+55[\s.-]?\(?(\d{2})\)?[\s.-]?(\d{4,5})[\s.-]?(\d{4})\b", 0.98),
    (r"\(?(\d{2})\)?[\s.-]?(\d{4,5})[\s.-]?(\d{4})\b", 0.85),
    (r"\b(\d{4,5})[\s.-](\d{4})\b", 0.65),
];

const POSITIVE_CONTEXT: &[&str] = &[
    r"tel[efone\.]*[\s:]*",
    r"telefone[\s:]*",
    r"celular[\s:]*",
    r"contato[\s:]*",
    r"fone[\s:]*",
    r"whatsapp[\s:]*",
    r"zap[\s:]*",
    r"ligar[\s:]*",
    r"ligue[\s:]*",
];

const NEGATIVE_CONTEXT: &[&str] = &[
    r"processo",
    r"sei[\s:]*",
    r"protocolo",
    r"ano[\s:]*",
    r"c[óo]digo",
    r"cpf",
    r"cnpj",
    r"cep",
];

/// Brazilian area codes in use
const AREA_CODES: &[u32] = &[
    11, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 24, 27, 28, 31, 32, 33, 34, 35, 37, 38, 41, 42,
    43, 44, 45, 46, 47, 48, 49, 51, 53, 54, 55, 61, 62, 63, 64, 65, 66, 67, 68, 69, 71, 73, 74,
    75, 77, 79, 81, 82, 83, 84, 85, 86, 87, 88, 89, 91, 92, 93, 94, 95, 96, 97, 98, 99,
];

const CONTEXT_WINDOW: usize = 30;

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

pub fn is_valid_area_code(code: &str) -> bool {
    code.parse::<u32>()
        .map(|c| AREA_CODES.contains(&c))
        .unwrap_or(false)
}

/// Digits of the national number, with a leading `+55` country code removed
fn national_digits(matched: &str) -> String {
    let digits = digits_only(matched);
    if matched.trim_start().starts_with("+55") {
        digits[2..].to_string()
    } else {
        digits
    }
}

#[derive(Debug, Clone)]
pub struct PhoneDetector {
    threshold: f64,
}

impl PhoneDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detect for PhoneDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        let view = TextView::new(text);
        let mut found = Vec::new();

        for (regex, base) in patterns() {
            for m in regex.find_iter(text) {
                let all_digits = digits_only(m.as_str());
                if !(8..=13).contains(&all_digits.len()) {
                    continue;
                }
                if all_digits.chars().all(|c| Some(c) == all_digits.chars().next()) {
                    continue;
                }
                // An 11-digit run that passes the CPF check is a CPF, not a mobile number
                if all_digits.len() == 11 && is_valid_cpf(&all_digits) {
                    continue;
                }

                let national = national_digits(m.as_str());
                let mut confidence = *base;
                let mut validated = false;
                if national.len() >= 10 {
                    if is_valid_area_code(&national[..2]) {
                        confidence = (confidence + 0.10).min(1.0);
                        validated = true;
                    } else {
                        confidence = (confidence - 0.20).max(0.3);
                    }
                }

                if positive_context().matches(&view.before(m.start(), CONTEXT_WINDOW)) {
                    confidence = (confidence + 0.15).min(1.0);
                }
                let window = view.around(m.start(), m.end(), CONTEXT_WINDOW, CONTEXT_WINDOW);
                if negative_context().matches(&window) {
                    confidence = (confidence - 0.30).max(0.2);
                }

                if confidence >= self.threshold {
                    found.push(view.record(
                        Category::Phone,
                        m.start(),
                        m.end(),
                        confidence,
                        validated,
                        DetectionMethod::PatternAreaCode,
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
    fn test_area_codes() {
        assert!(is_valid_area_code("61"));
        assert!(is_valid_area_code("11"));
        assert!(!is_valid_area_code("20"));
        assert!(!is_valid_area_code("00"));
    }

    #[test]
    fn test_labeled_mobile_number() {
        let records = PhoneDetector::new(0.75).detect("Telefone: (61) 99999-8888");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value, "(61) 99999-8888");
        assert_eq!(records[0].confidence, 1.0);
        assert!(records[0].validated);
    }

    #[test]
    fn test_country_code_form() {
        let records = PhoneDetector::new(0.75).detect("ligue +55 11 98765-4321 hoje");
        assert_eq!(records.len(), 1);
        assert!(records[0].raw_value.starts_with("+55"));
        assert!(records[0].validated);
    }

    #[test]
    fn test_valid_cpf_digits_are_not_a_phone() {
        assert!(PhoneDetector::new(0.0).detect("52998224725").is_empty());
        // Satisfies the CPF check digits
        assert!(PhoneDetector::new(0.75).detect("telefone 01234567890").is_empty());
    }

    #[test]
    fn test_invalid_area_code_and_negative_context() {
        let detector = PhoneDetector::new(0.75);
        assert!(detector.detect("(20) 99999-8888").is_empty());
        assert!(detector.detect("processo 3333-4444").is_empty());
    }

    #[test]
    fn test_repeated_digits_rejected() {
        assert!(PhoneDetector::new(0.0).detect("tel 9999-9999").is_empty());
    }
}
