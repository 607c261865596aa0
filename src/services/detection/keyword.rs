// Contextual keyword detector
// Flags health, social, minor, disciplinary and financial subjects when the request is personal

use super::dedup::dedupe_by_confidence;
use super::text_view::{compile, ContextTable, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord, KeywordBucket};
use regex::Regex;
use std::sync::OnceLock;

const KEYWORDS: &[(&str, KeywordBucket, f64)] = &[
    (
        r"\b(laudo|atestad[ao]|exame|diagn[óo]stico|tratamento|cirurgia|interna[çc][ãa]o)\b",
        KeywordBucket::Health,
        0.85,
    ),
    (
        r"\b(c[âa]ncer|tumor|doen[çc]a|autismo|tea|defici[êe]ncia|hiv|aids|gravidez|gestante)\b",
        KeywordBucket::Health,
        0.90,
    ),
    (
        r"\b(psic[óo]log[oa]|psiquiatra|terapia|medicamento|rem[ée]dio|receita m[ée]dica)\b",
        KeywordBucket::Health,
        0.80,
    ),
    (
        r"\b(bolsa fam[íi]lia|aux[íi]lio|benef[íi]cio|renda|vulnerabilidade|risco social)\b",
        KeywordBucket::Social,
        0.75,
    ),
    (
        r"\b(medida protetiva|viol[êe]ncia|abuso|agress[ãa]o|boletim de ocorr[êe]ncia)\b",
        KeywordBucket::Sensitive,
        0.90,
    ),
    (
        r"\b(menor de idade|crian[çc]a|adolescente|tutelad[oa])\b",
        KeywordBucket::Minor,
        0.85,
    ),
    (
        r"\b(identidade|rg|carteira|documento|habilita[çc][ãa]o|cnh)\b",
        KeywordBucket::ImplicitDocument,
        0.70,
    ),
    (
        r"\b(meu cadastro|atualizar cadastro|fazer cadastro|meus dados)\b",
        KeywordBucket::Registration,
        0.75,
    ),
    (
        r"\b(processo disciplinar|sindic[âa]ncia|pad|punido|advert[êe]ncia|demiss[ãa]o)\b",
        KeywordBucket::AdministrativeSensitive,
        0.85,
    ),
    (
        r"\b(aposentadoria|pens[ãa]o|folha de pagamento|contracheque|holerite)\b",
        KeywordBucket::Financial,
        0.80,
    ),
];

const PERSONAL_CONTEXT: &[&str] = &[
    r"meu",
    r"minha",
    r"solicito",
    r"requerimento",
    r"cópia",
    r"acesso",
    r"enviar",
    r"encaminhar",
    r"me cadastrar",
];

const GENERIC_CONTEXT: &[&str] = &[
    r"estat[íi]stica",
    r"quantitativo",
    r"quantos",
    r"total",
    r"dados gerais",
    r"levantamento",
    r"número de",
    r"lista de",
    r"todos os",
    r"quaisquer",
];

const CONTEXT_WINDOW: usize = 50;

fn keywords() -> &'static [(Regex, KeywordBucket, f64)] {
    static RE: OnceLock<Vec<(Regex, KeywordBucket, f64)>> = OnceLock::new();
    RE.get_or_init(|| {
        KEYWORDS
            .iter()
            .map(|(p, bucket, c)| (compile(&format!("(?i){}", p)), *bucket, *c))
            .collect()
    })
}

fn personal_context() -> &'static ContextTable {
    static TABLE: OnceLock<ContextTable> = OnceLock::new();
    TABLE.get_or_init(|| ContextTable::new(PERSONAL_CONTEXT))
}

fn generic_context() -> &'static ContextTable {
    static TABLE: OnceLock<ContextTable> = OnceLock::new();
    TABLE.get_or_init(|| ContextTable::new(GENERIC_CONTEXT))
}

#[derive(Debug, Clone)]
pub struct KeywordDetector {
    threshold: f64,
}

impl KeywordDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detect for KeywordDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        let view = TextView::new(text);
        let mut found = Vec::new();

        for (regex, bucket, base) in keywords() {
            for m in regex.find_iter(text) {
                let before = view.before(m.start(), CONTEXT_WINDOW);
                let personal = personal_context().matches(&before);

                if *bucket == KeywordBucket::ImplicitDocument && !personal {
                    continue;
                }

                let mut confidence = *base;
                if personal {
                    confidence = (confidence + 0.15).min(1.0);
                }
                if !bucket.exempt_from_generic_penalty() && generic_context().matches(&before) {
                    confidence = (confidence - 0.40).max(0.2);
                }

                if confidence >= self.threshold {
                    found.push(view.record(
                        Category::Keyword(*bucket),
                        m.start(),
                        m.end(),
                        confidence,
                        personal,
                        DetectionMethod::Keyword,
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

    fn detector() -> KeywordDetector {
        KeywordDetector::new(0.65)
    }

    #[test]
    fn test_personal_health_request() {
        let records = detector().detect("Solicito cópia do meu laudo médico");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::Keyword(KeywordBucket::Health));
        assert_eq!(records[0].raw_value, "laudo");
        assert_eq!(records[0].confidence, 1.0);
        assert!(records[0].validated);
    }

    #[test]
    fn test_generic_statistics_penalty() {
        let records = detector().detect("Quantos benefícios foram pagos? Qual o total de aposentadoria?");
        assert!(records.is_empty());
    }

    #[test]
    fn test_health_exempt_from_generic_penalty() {
        let records = detector().detect("estatística de casos de câncer");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, 0.9);
        assert!(!records[0].validated);
    }

    #[test]
    fn test_implicit_document_requires_personal_context() {
        assert!(detector().detect("o documento foi publicado").is_empty());
        let records = detector().detect("preciso do meu documento");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].category,
            Category::Keyword(KeywordBucket::ImplicitDocument)
        );
    }

    #[test]
    fn test_plural_possessives_count_as_personal() {
        let records = detector().detect("quero meus laudos e o documento");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].category,
            Category::Keyword(KeywordBucket::ImplicitDocument)
        );
        assert_eq!(records[0].raw_value, "documento");
        assert_eq!(records[0].confidence, 0.85);
        assert!(records[0].validated);

        let records = detector().detect("minhas sessões de terapia");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, 0.95);
        assert!(records[0].validated);

        // Only the singular keyword is in the table
        assert!(detector().detect("quero meus documentos").is_empty());
    }

    #[test]
    fn test_word_boundaries() {
        assert!(detector().detect("o teatro municipal").is_empty());
        assert!(detector().detect("padaria").is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let records = detector().detect("MEU PROCESSO DISCIPLINAR");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].category,
            Category::Keyword(KeywordBucket::AdministrativeSensitive)
        );
    }
}
