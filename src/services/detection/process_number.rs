// Process number detector
// SEI, protocol, police-occurrence and debt-certificate (CDA) numbers

use super::dedup::dedupe_by_confidence;
use super::text_view::{compile, ContextTable, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord};
use regex::Regex;
use std::sync::OnceLock;

const PATTERNS: &[(&str, Category, f64)] = &[
    (r"\b(\d{5})-?(\d{8})/(\d{4})-(\d{2})\b", Category::ProcessSei, 0.95),
    (r"\b(\d{10,13})/(\d{4})-(\d{2})\b", Category::ProcessSei, 0.90),
    (r"\b(\d{8,13})/(\d{4})\b", Category::ProcessProtocol, 0.85),
    (r"\b(\d{16})\b", Category::ProcessOccurrence, 0.80),
    (r"\b(\d{10})\b", Category::ProcessCda, 0.60),
];

const POSITIVE_CONTEXT: &[&str] = &[
    r"processo[s]?[\s:]*n?[úu]?m?e?r?o?[\s:]*",
    r"protocolo[\s:]*",
    r"sei[\s:]*",
    r"ocorr[êe]ncia[\s:]*",
    r"n[úu]mero[\s:]*",
    r"cda[\s:]*",
    r"solicito[\s\w]*processo",
    r"acesso[\s\w]*processo",
];

const NEGATIVE_CONTEXT: &[&str] = &[
    r"cpf",
    r"cnpj",
    r"telefone",
    r"fone",
    r"cep",
    r"ano[\s:]*",
    r"data[\s:]*",
];

const WINDOW_BEFORE: usize = 50;
const WINDOW_AFTER: usize = 30;

fn patterns() -> &'static [(Regex, Category, f64)] {
    static RE: OnceLock<Vec<(Regex, Category, f64)>> = OnceLock::new();
    RE.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(p, category, c)| (compile(p), category.clone(), *c))
            .collect()
    })
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
pub struct ProcessNumberDetector {
    threshold: f64,
}

impl ProcessNumberDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detect for ProcessNumberDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        let view = TextView::new(text);
        let mut found = Vec::new();

        for (regex, category, base) in patterns() {
            for m in regex.find_iter(text) {
                let window = view.around(m.start(), m.end(), WINDOW_BEFORE, WINDOW_AFTER);
                let positive = positive_context().matches(&window);

                // A bare ten-digit run is only a CDA when the text says so
                if *category == Category::ProcessCda && !positive {
                    continue;
                }

                let mut confidence = *base;
                if positive {
                    confidence = (confidence + 0.15).min(1.0);
                }
                if negative_context().matches(&window) {
                    confidence = (confidence - 0.30).max(0.2);
                }

                if confidence >= self.threshold {
                    let validated =
                        matches!(category, Category::ProcessSei | Category::ProcessProtocol);
                    found.push(view.record(
                        category.clone(),
                        m.start(),
                        m.end(),
                        confidence,
                        validated,
                        DetectionMethod::PatternContext,
                    ));
                }
            }
        }

        dedupe_by_confidence(found)
    }
}
