// Person name detector
// Capitalized word sequences scored against first-name and surname dictionaries

use super::dedup::dedupe_by_confidence;
use super::text_view::{compile, ContextTable, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord};
use crate::services::word_list::NameDictionary;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const PATTERN: &str = r"\b([A-ZÁÉÍÓÚÂÊÔÃÕÇ][a-záéíóúâêôãõç]+(?:\s+(?:de|da|do|dos|das|e|di|del|[A-ZÁÉÍÓÚÂÊÔÃÕÇ][a-záéíóúâêôãõç]+))+)\b";

const CONNECTIVES: &[&str] = &["de", "da", "do", "das", "dos", "e", "di", "del"];

/// Words that mark an institution, place or date rather than a person
const NON_NAME_WORDS: &[&str] = &[
    "secretaria", "departamento", "coordenação", "diretoria", "gerência", "subsecretaria",
    "superintendência", "administração", "governo", "ministério", "tribunal", "justiça",
    "polícia", "hospital", "universidade", "faculdade", "instituto", "fundação", "associação",
    "empresa", "companhia", "sociedade", "organização", "programa", "projeto", "sistema",
    "plataforma", "serviço", "unidade", "estado", "distrito", "federal", "nacional", "regional",
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro", "segunda", "terça", "quarta", "quinta", "sexta",
    "sábado", "domingo",
];

const CONTEXT: &[&str] = &[
    r"nome[\s:]*",
    r"chamad[oa][\s:]*",
    r"sr\.?a?[\s:]*",
    r"senhor[a]?[\s:]*",
    r"requerente[\s:]*",
    r"solicitante[\s:]*",
    r"autor[\s:]*",
    r"cidad[ãa]o[\s:]*",
    r"servidor[\s:]*",
    r"funcion[áa]rio[\s:]*",
    r"benefici[áa]rio[\s:]*",
];

const CONTEXT_WINDOW: usize = 30;
const MAX_SIGNIFICANT_TOKENS: usize = 5;
const MIN_NAME_CHARS: usize = 8;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(PATTERN))
}

fn context() -> &'static ContextTable {
    static TABLE: OnceLock<ContextTable> = OnceLock::new();
    TABLE.get_or_init(|| ContextTable::new(CONTEXT))
}

fn non_name_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| NON_NAME_WORDS.iter().copied().collect())
}

fn is_connective(token: &str) -> bool {
    CONNECTIVES.contains(&token)
}

/// Byte length of the candidate once trailing connectives ("... Silva e") are dropped
fn trimmed_len(candidate: &str) -> usize {
    let mut end = candidate.len();
    loop {
        let head = candidate[..end].trim_end();
        match head.rsplit_once(char::is_whitespace) {
            Some((rest, last)) if is_connective(last) => end = rest.trim_end().len(),
            _ => return head.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersonNameDetector {
    threshold: f64,
    names: NameDictionary,
}

impl PersonNameDetector {
    pub fn new(threshold: f64, names: NameDictionary) -> Self {
        Self { threshold, names }
    }

    fn score(&self, candidate: &str, before: &str) -> Option<(f64, bool)> {
        let tokens: Vec<&str> = candidate.split_whitespace().collect();
        let significant: Vec<&str> = tokens.iter().copied().filter(|t| !is_connective(t)).collect();
        if significant.len() < 2 {
            return None;
        }
        if significant
            .iter()
            .any(|t| non_name_words().contains(t.to_lowercase().as_str()))
        {
            return None;
        }

        let first = significant[0];
        let last = significant[significant.len() - 1];
        let known_first = self.names.is_first_name(first);

        let mut confidence: f64 = 0.5;
        if known_first {
            confidence += 0.25;
        }
        if self.names.is_surname(last) {
            confidence += 0.20;
        }
        if context().matches(before) {
            confidence += 0.15;
        }
        confidence = confidence.min(1.0);

        if candidate.chars().count() < MIN_NAME_CHARS {
            confidence -= 0.10;
        }
        if significant.len() > MAX_SIGNIFICANT_TOKENS {
            confidence -= 0.15;
        }

        Some((confidence, known_first))
    }
}

impl Detect for PersonNameDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        let view = TextView::new(text);
        let mut found = Vec::new();

        for m in pattern().find_iter(text) {
            let end = m.start() + trimmed_len(m.as_str());
            let candidate = &text[m.start()..end];
            let Some((confidence, known_first)) =
                self.score(candidate, &view.before(m.start(), CONTEXT_WINDOW))
            else {
                continue;
            };

            if confidence >= self.threshold {
                found.push(view.record(
                    Category::PersonName,
                    m.start(),
                    end,
                    confidence,
                    known_first,
                    DetectionMethod::PatternDictionary,
                ));
            }
        }

        dedupe_by_confidence(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> PersonNameDetector {
        PersonNameDetector::new(0.70, NameDictionary::builtin())
    }

    #[test]
    fn test_trailing_connective_trimmed() {
        assert_eq!(trimmed_len("Pedro Alves e"), "Pedro Alves".len());
        assert_eq!(trimmed_len("Maria dos Santos"), "Maria dos Santos".len());
    }

    #[test]
    fn test_known_name_with_label() {
        let records = detector().detect("Nome: João Silva Santos, requerente");
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.raw_value, "João Silva Santos");
        assert_eq!(r.confidence, 1.0);
        assert!(r.validated);
        assert_eq!(r.start_offset, 6);
    }

    #[test]
    fn test_connectives_inside_name() {
        let records = detector().detect("atendimento a Maria dos Santos ontem");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value, "Maria dos Santos");
        assert_eq!(records[0].confidence, 0.95);
    }

    #[test]
    fn test_institution_names_rejected() {
        assert!(detector().detect("Secretaria de Estado de Saúde").is_empty());
        assert!(detector().detect("Hospital Regional Norte").is_empty());
        assert!(detector().detect("reunião em Segunda Feira").is_empty());
        assert!(!detector().detect("contato com Marco Antonio Silva").is_empty());
    }

    #[test]
    fn test_unknown_words_stay_below_threshold() {
        assert!(detector().detect("Lorem Ipsum dolor").is_empty());
        let permissive = PersonNameDetector::new(0.0, NameDictionary::builtin());
        let records = permissive.detect("Lorem Ipsum dolor");
        assert_eq!(records.len(), 1);
        assert!(!records[0].validated);
        assert_eq!(records[0].confidence, 0.5);
    }

    #[test]
    fn test_single_capitalized_word_ignored() {
        assert!(detector().detect("Brasília é a capital").is_empty());
    }
}
