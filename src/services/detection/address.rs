// Address detector
// Postal codes (CEP) and street-prefixed phrases, reported as separate subtypes

use super::dedup::dedupe_by_confidence;
use super::text_view::{compile, digits_only, ContextTable, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord};
use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

const POSTAL_CODE: &str = r"\b(\d{5})[-.\s]?(\d{3})\b";
const STREET: &str =
    r"(?i)\b(rua|av\.?|avenida|alameda|travessa|quadra|qd\.?|conjunto|conj\.?|bloco|bl\.?|lote|lt\.?)[\s,]+[^,\n]{5,50}";

const CONTEXT: &[&str] = &[
    r"endere[çc]o[\s:]*",
    r"resid[êe]ncia[\s:]*",
    r"mora[\s:]*",
    r"cep[\s:]*",
    r"localiza[çc][ãa]o[\s:]*",
];

/// Numeric range covered by Brazilian postal codes
const POSTAL_CODE_RANGE: RangeInclusive<u32> = 1_000_000..=99_999_999;

const CONTEXT_WINDOW: usize = 30;

fn patterns() -> &'static [(Regex, Category, f64)] {
    static RE: OnceLock<Vec<(Regex, Category, f64)>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![
            (compile(POSTAL_CODE), Category::AddressPostalCode, 0.85),
            (compile(STREET), Category::AddressStreet, 0.75),
        ]
    })
}

fn context() -> &'static ContextTable {
    static TABLE: OnceLock<ContextTable> = OnceLock::new();
    TABLE.get_or_init(|| ContextTable::new(CONTEXT))
}

fn is_plausible_postal_code(matched: &str) -> bool {
    digits_only(matched)
        .parse::<u32>()
        .map(|n| POSTAL_CODE_RANGE.contains(&n))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct AddressDetector {
    threshold: f64,
}

impl AddressDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detect for AddressDetector {
    /// Overlaps are resolved per subtype; a CEP inside a street phrase is kept as its own record.
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        let view = TextView::new(text);
        let mut found = Vec::new();

        for (regex, category, base) in patterns() {
            let mut subtype = Vec::new();
            for m in regex.find_iter(text) {
                let mut confidence = *base;
                if context().matches(&view.before(m.start(), CONTEXT_WINDOW)) {
                    confidence = (confidence + 0.10).min(1.0);
                }

                let mut validated = false;
                if *category == Category::AddressPostalCode {
                    validated = is_plausible_postal_code(m.as_str());
                    if !validated {
                        confidence = (confidence - 0.30).max(0.3);
                    }
                }

                if confidence >= self.threshold {
                    subtype.push(view.record(
                        category.clone(),
                        m.start(),
                        m.end(),
                        confidence,
                        validated,
                        DetectionMethod::Pattern,
                    ));
                }
            }
            found.extend(dedupe_by_confidence(subtype));
        }

        found.sort_by_key(|r| r.start_offset);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postal_code_with_context() {
        let records = AddressDetector::new(0.80).detect("CEP: 70040-010");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::AddressPostalCode);
        assert_eq!(records[0].confidence, 0.95);
        assert!(records[0].validated);
    }

    #[test]
    fn test_out_of_range_postal_code() {
        assert!(!is_plausible_postal_code("00000-123"));
        assert!(is_plausible_postal_code("01310-100"));
        assert!(AddressDetector::new(0.80).detect("CEP 00000-123").is_empty());
    }

    #[test]
    fn test_street_with_context() {
        let records = AddressDetector::new(0.80).detect("Endereço: Rua das Palmeiras 45, apto 3");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::AddressStreet);
        assert_eq!(records[0].raw_value, "Rua das Palmeiras 45");
        assert_eq!(records[0].confidence, 0.85);
        assert!(!records[0].validated);
    }

    #[test]
    fn test_street_without_context_below_threshold() {
        assert!(AddressDetector::new(0.80).detect("vire na Rua das Palmeiras").is_empty());
    }

    #[test]
    fn test_subtypes_may_overlap() {
        let text = "endereço: Quadra 5 conjunto B lote 10 CEP 70000-100";
        let records = AddressDetector::new(0.0).detect(text);
        assert!(records.iter().any(|r| r.category == Category::AddressPostalCode));
        assert!(records.iter().any(|r| r.category == Category::AddressStreet));
        for window in records.windows(2) {
            assert!(window[0].start_offset <= window[1].start_offset);
        }
    }
}
