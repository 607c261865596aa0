// Email detector

use super::dedup::dedupe_by_confidence;
use super::text_view::{compile, ContextTable, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord};
use regex::Regex;
use std::sync::OnceLock;

const PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

const CONSUMER_DOMAINS: &[&str] = &[
    "gmail.com",
    "hotmail.com",
    "outlook.com",
    "yahoo.com",
    "yahoo.com.br",
    "live.com",
    "msn.com",
    "icloud.com",
    "uol.com.br",
    "bol.com.br",
    "terra.com.br",
    "globo.com",
    "ig.com.br",
    "oi.com.br",
    "r7.com",
];

const GOVERNMENT_SUFFIXES: &[&str] = &[".gov.br", ".leg.br", ".jus.br", ".mil.br", ".df.gov.br"];

const CONTEXT: &[&str] = &[
    r"e-?mail[\s:]*",
    r"email[\s:]*",
    r"correio[\s\w]*eletr[ôo]nico",
    r"contato[\s:]*",
    r"enviar[\s\w]*para",
    r"escreva[\s\w]*para",
];

const CONTEXT_WINDOW: usize = 30;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(PATTERN))
}

fn context() -> &'static ContextTable {
    static TABLE: OnceLock<ContextTable> = OnceLock::new();
    TABLE.get_or_init(|| ContextTable::new(CONTEXT))
}

/// At least two non-empty labels, none starting or ending with a hyphen
fn is_well_formed_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels
            .iter()
            .all(|l| !l.is_empty() && !l.starts_with('-') && !l.ends_with('-'))
}

fn domain_confidence(domain: &str) -> f64 {
    if CONSUMER_DOMAINS.contains(&domain) {
        0.98
    } else if GOVERNMENT_SUFFIXES.iter().any(|s| domain.ends_with(s)) {
        0.95
    } else if !is_well_formed_domain(domain) {
        0.50
    } else {
        0.90
    }
}

#[derive(Debug, Clone)]
pub struct EmailDetector {
    threshold: f64,
}

impl EmailDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detect for EmailDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        let view = TextView::new(text);
        let mut found = Vec::new();

        for m in pattern().find_iter(text) {
            let domain = match m.as_str().rsplit_once('@') {
                Some((_, d)) => d.to_lowercase(),
                None => continue,
            };

            let mut confidence = domain_confidence(&domain);
            if context().matches(&view.before(m.start(), CONTEXT_WINDOW)) {
                confidence = (confidence + 0.05).min(1.0);
            }

            if confidence >= self.threshold {
                found.push(view.record(
                    Category::Email,
                    m.start(),
                    m.end(),
                    confidence,
                    is_well_formed_domain(&domain),
                    DetectionMethod::PatternDomain,
                ));
            }
        }

        dedupe_by_confidence(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_tiers() {
        assert_eq!(domain_confidence("gmail.com"), 0.98);
        assert_eq!(domain_confidence("saude.df.gov.br"), 0.95);
        assert_eq!(domain_confidence("empresa.com.br"), 0.90);
        assert_eq!(domain_confidence("a..com"), 0.50);
    }

    #[test]
    fn test_labeled_email() {
        let records = EmailDetector::new(0.85).detect("E-mail: joao@email.com");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value, "joao@email.com");
        assert_eq!(records[0].confidence, 0.95);
        assert!(records[0].validated);
    }

    #[test]
    fn test_consumer_domain_case_insensitive() {
        let records = EmailDetector::new(0.85).detect("fale com Maria.Souza@Gmail.com hoje");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, 0.98);
    }

    #[test]
    fn test_malformed_domain_below_threshold() {
        assert!(EmailDetector::new(0.85).detect("x@a..com").is_empty());
        let records = EmailDetector::new(0.0).detect("x@a..com");
        assert_eq!(records.len(), 1);
        assert!(!records[0].validated);
    }

    #[test]
    fn test_no_at_sign() {
        assert!(EmailDetector::new(0.0).detect("sem contato eletronico").is_empty());
    }
}
