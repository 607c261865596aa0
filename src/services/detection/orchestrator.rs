// Detection orchestrator
// Stage 1: pattern detectors. Stage 2: entity recognizer merge. Stage 3: generative fallback.

use super::classifier::{ContentClassifier, GeminiClassifier};
use super::field_detector::{Detect, FieldDetector};
use super::recognizer::{map_recognizer_label, EntityRecognizer, HttpEntityRecognizer};
use super::sensitivity::DetectorConfig;
use super::text_view::{round_confidence, TextView};
use crate::models::{
    Category, DetectionMethod, DetectionRecord, DetectionSummary, DetectorKind, RecognizedEntity,
    SUBJECTIVE_PLACEHOLDER,
};
use crate::services::config_store::{AppConfig, ConfigError};
use crate::services::providers::get_api_key;
use crate::services::word_list::NameDictionary;
use std::sync::{Mutex, OnceLock};
use tracing::{debug, info, warn};

/// Minimum classifier score that produces a whole-text record
pub const FALLBACK_MIN_SCORE: f64 = 0.70;

const FALLBACK_SNIPPET_CHARS: usize = 200;

type Factory<T> = Box<dyn FnOnce() -> Option<Box<T>> + Send>;

/// Adapter built on first use. The factory runs at most once and a rejected
/// adapter (`None`, or failing the readiness check) stays disabled.
struct LazyAdapter<T: ?Sized> {
    configured: bool,
    factory: Mutex<Option<Factory<T>>>,
    cell: OnceLock<Option<Box<T>>>,
}

impl<T: ?Sized> LazyAdapter<T> {
    fn disabled() -> Self {
        Self {
            configured: false,
            factory: Mutex::new(None),
            cell: OnceLock::new(),
        }
    }

    fn new(factory: Factory<T>) -> Self {
        Self {
            configured: true,
            factory: Mutex::new(Some(factory)),
            cell: OnceLock::new(),
        }
    }

    fn get_checked(&self, ready: impl FnOnce(&T) -> bool) -> Option<&T> {
        if !self.configured {
            return None;
        }
        self.cell
            .get_or_init(|| {
                let factory = self.factory.lock().ok().and_then(|mut slot| slot.take());
                factory
                    .and_then(|build| build())
                    .filter(|adapter| ready(adapter.as_ref()))
            })
            .as_deref()
    }
}

pub struct DetectionOrchestrator {
    config: DetectorConfig,
    names: NameDictionary,
    detectors: Vec<FieldDetector>,
    recognizer: LazyAdapter<dyn EntityRecognizer>,
    recognizer_labels: Vec<String>,
    classifier: LazyAdapter<dyn ContentClassifier>,
}

impl DetectionOrchestrator {
    /// Pattern detectors only; adapters are attached with the `with_*` builders
    pub fn new(config: &DetectorConfig, names: NameDictionary) -> Self {
        let detectors = FieldDetector::all(config, &names)
            .into_iter()
            .filter(|d| config.is_enabled(d.kind()))
            .collect();
        Self {
            config: config.clone(),
            names,
            detectors,
            recognizer: LazyAdapter::disabled(),
            recognizer_labels: super::recognizer::DEFAULT_RECOGNIZER_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            classifier: LazyAdapter::disabled(),
        }
    }

    /// Wire detectors, word lists and adapters from the stored configuration
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let names = NameDictionary::load(
            config.word_lists.first_names.as_deref(),
            config.word_lists.surnames.as_deref(),
        )?;
        let mut orchestrator = Self::new(&config.detection, names);
        let proxy = config
            .proxy
            .as_ref()
            .and_then(|p| p.active_url())
            .map(str::to_string);

        if config.recognizer.enabled {
            let recognizer_config = config.recognizer.clone();
            let proxy = proxy.clone();
            orchestrator.recognizer_labels = recognizer_config.labels.clone();
            orchestrator = orchestrator.with_recognizer_factory(move || {
                match HttpEntityRecognizer::from_config(&recognizer_config, proxy.as_deref()) {
                    Ok(r) => Some(Box::new(r) as Box<dyn EntityRecognizer>),
                    Err(e) => {
                        warn!("[orchestrator] Entity recognizer unavailable: {}", e);
                        None
                    }
                }
            });
        }

        if config.classifier.enabled != Some(false) {
            let api_key = config
                .api_keys
                .get("gemini")
                .cloned()
                .or_else(|| get_api_key("gemini"));
            if config.classifier.enabled == Some(true) || api_key.is_some() {
                let classifier_config = config.classifier.clone();
                orchestrator = orchestrator.with_classifier_factory(move || {
                    match GeminiClassifier::from_config(&classifier_config, api_key, proxy.as_deref()) {
                        Ok(c) => Some(Box::new(c) as Box<dyn ContentClassifier>),
                        Err(e) => {
                            warn!("[orchestrator] Content classifier unavailable: {}", e);
                            None
                        }
                    }
                });
            }
        }

        Ok(orchestrator)
    }

    pub fn with_recognizer<R: EntityRecognizer + 'static>(self, recognizer: R) -> Self {
        self.with_recognizer_factory(move || Some(Box::new(recognizer) as Box<dyn EntityRecognizer>))
    }

    /// The factory runs on first `analyze` (or `warm_up`); the recognizer's
    /// availability probe runs once right after it.
    pub fn with_recognizer_factory<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> Option<Box<dyn EntityRecognizer>> + Send + 'static,
    {
        self.recognizer = LazyAdapter::new(Box::new(factory));
        self
    }

    pub fn with_recognizer_labels(mut self, labels: Vec<String>) -> Self {
        self.recognizer_labels = labels;
        self
    }

    pub fn with_classifier<C: ContentClassifier + 'static>(self, classifier: C) -> Self {
        self.with_classifier_factory(move || Some(Box::new(classifier) as Box<dyn ContentClassifier>))
    }

    pub fn with_classifier_factory<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> Option<Box<dyn ContentClassifier>> + Send + 'static,
    {
        self.classifier = LazyAdapter::new(Box::new(factory));
        self
    }

    /// Drop both adapters; only stage 1 runs afterwards
    pub fn without_adapters(mut self) -> Self {
        self.recognizer = LazyAdapter::disabled();
        self.classifier = LazyAdapter::disabled();
        self
    }

    /// Restrict stage 1 to `kinds`, keeping each detector's configured threshold
    pub fn set_active_detectors(&mut self, kinds: &[DetectorKind]) {
        self.detectors = FieldDetector::all(&self.config, &self.names)
            .into_iter()
            .filter(|d| kinds.contains(&d.kind()))
            .collect();
    }

    pub fn active_detectors(&self) -> Vec<DetectorKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }

    /// Build the adapters now instead of on the first `analyze`
    pub fn warm_up(&self) {
        let recognizer = self.recognizer().is_some();
        let classifier = self.classifier().is_some();
        info!(recognizer, classifier, "[orchestrator] Adapters initialized");
    }

    fn recognizer(&self) -> Option<&dyn EntityRecognizer> {
        self.recognizer.get_checked(|r| {
            let available = r.is_available();
            if !available {
                warn!("[orchestrator] Entity recognizer not available, continuing without it");
            }
            available
        })
    }

    fn classifier(&self) -> Option<&dyn ContentClassifier> {
        self.classifier.get_checked(|_| true).filter(|c| c.is_active())
    }

    pub fn analyze(&self, text: &str) -> Vec<DetectionRecord> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let view = TextView::new(text);

        let mut records: Vec<DetectionRecord> = self
            .detectors
            .iter()
            .flat_map(|d| d.detect(text))
            .collect();
        debug!("[orchestrator] Stage 1 produced {} records", records.len());

        if let Some(recognizer) = self.recognizer() {
            match recognizer.detect(text, &self.recognizer_labels) {
                Ok(entities) => merge_entities(&mut records, entities, &view),
                Err(e) => warn!("[orchestrator] Entity recognizer failed, skipping: {}", e),
            }
        }

        if records.is_empty() {
            if let Some(classifier) = self.classifier() {
                match classifier.score(text) {
                    Ok(score) if score >= FALLBACK_MIN_SCORE => {
                        info!(score, "[orchestrator] Generative fallback flagged the text");
                        records.push(fallback_record(&view, score, classifier.model_name()));
                    }
                    Ok(score) => debug!(score, "[orchestrator] Generative fallback below cutoff"),
                    Err(e) => warn!("[orchestrator] Content classifier failed, skipping: {}", e),
                }
            }
        }

        records.sort_by_key(|r| r.start_offset);
        records
    }

    pub fn contains_sensitive_data(&self, text: &str) -> bool {
        !self.analyze(text).is_empty()
    }

    pub fn summarize(&self, text: &str) -> DetectionSummary {
        DetectionSummary::from_records(self.analyze(text))
    }
}

/// Upgrade overlapped stage-1 records to hybrid, append the rest as model records
fn merge_entities(records: &mut Vec<DetectionRecord>, entities: Vec<RecognizedEntity>, view: &TextView) {
    let stage_one = records.len();
    let mut added = 0usize;
    let mut upgraded = 0usize;

    for entity in entities {
        if entity.start >= entity.end || entity.end > view.char_len() {
            debug!(
                start = entity.start,
                end = entity.end,
                "[orchestrator] Ignoring entity with invalid span"
            );
            continue;
        }

        let overlapping = records[..stage_one]
            .iter_mut()
            .find(|r| r.overlaps(entity.start, entity.end));

        match overlapping {
            Some(record) => {
                if entity.score > record.confidence && !record.detection_method.is_hybrid() {
                    record.detection_method = record.detection_method.clone().into_hybrid();
                    upgraded += 1;
                }
            }
            None => {
                records.push(DetectionRecord {
                    category: map_recognizer_label(&entity.label),
                    raw_value: entity.text,
                    start_offset: entity.start,
                    end_offset: entity.end,
                    confidence: round_confidence(entity.score),
                    validated: false,
                    detection_method: DetectionMethod::ExternalModel,
                    context_snippet: view.snippet_chars(entity.start, entity.end),
                });
                added += 1;
            }
        }
    }

    debug!(added, upgraded, "[orchestrator] Stage 2 merged");
}

fn fallback_record(view: &TextView, score: f64, model: &str) -> DetectionRecord {
    DetectionRecord {
        category: Category::SubjectiveLlm,
        raw_value: SUBJECTIVE_PLACEHOLDER.to_string(),
        start_offset: 0,
        end_offset: view.char_len(),
        confidence: round_confidence(score),
        validated: false,
        detection_method: DetectionMethod::GenerativeFallback {
            model: model.to_string(),
        },
        context_snippet: view.slice_chars(0, FALLBACK_SNIPPET_CHARS).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SAMPLE: &str = "Nome: João Silva Santos CPF: 123.456.789-09 E-mail: joao@email.com Telefone: (61) 99999-8888";

    struct StubRecognizer {
        entities: Vec<RecognizedEntity>,
        available: bool,
        calls: Arc<AtomicUsize>,
    }

    impl EntityRecognizer for StubRecognizer {
        fn is_available(&self) -> bool {
            self.available
        }

        fn detect(&self, _text: &str, _labels: &[String]) -> Result<Vec<RecognizedEntity>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entities.clone())
        }
    }

    struct FailingRecognizer;

    impl EntityRecognizer for FailingRecognizer {
        fn is_available(&self) -> bool {
            true
        }

        fn detect(&self, _text: &str, _labels: &[String]) -> Result<Vec<RecognizedEntity>, ProviderError> {
            Err(ProviderError::MissingContent)
        }
    }

    struct StubClassifier {
        score: Result<f64, ()>,
        active: bool,
        calls: Arc<AtomicUsize>,
    }

    impl ContentClassifier for StubClassifier {
        fn is_active(&self) -> bool {
            self.active
        }

        fn model_name(&self) -> &str {
            "stub-model"
        }

        fn score(&self, _text: &str) -> Result<f64, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.score
                .map_err(|_| ProviderError::ApiError { status: 500, message: "boom".to_string() })
        }
    }

    fn entity(label: &str, text: &str, start: usize, end: usize, score: f64) -> RecognizedEntity {
        RecognizedEntity {
            label: label.to_string(),
            text: text.to_string(),
            start,
            end,
            score,
        }
    }

    fn classifier(score: f64, calls: &Arc<AtomicUsize>) -> StubClassifier {
        StubClassifier {
            score: Ok(score),
            active: true,
            calls: calls.clone(),
        }
    }

    fn orchestrator() -> DetectionOrchestrator {
        DetectionOrchestrator::new(&DetectorConfig::default(), NameDictionary::builtin())
    }

    #[test]
    fn test_end_to_end_sample() {
        let records = orchestrator().analyze(SAMPLE);
        let categories: Vec<_> = records.iter().map(|r| r.category.clone()).collect();
        assert_eq!(
            categories,
            vec![Category::PersonName, Category::Cpf, Category::Email, Category::Phone]
        );
        assert!(records.iter().all(|r| r.validated));

        let cpf = &records[1];
        assert_eq!(cpf.raw_value, "123.456.789-09");
        assert_eq!(cpf.confidence, 1.0);
        assert_eq!(cpf.detection_method, DetectionMethod::PatternValidation);

        let phone = &records[3];
        assert_eq!(phone.raw_value, "(61) 99999-8888");
        assert_eq!(phone.confidence, 1.0);
    }

    #[test]
    fn test_blank_text() {
        let o = orchestrator();
        assert!(o.analyze("").is_empty());
        assert!(o.analyze("   \n\t").is_empty());
        assert!(!o.contains_sensitive_data(""));
    }

    #[test]
    fn test_output_sorted_and_deterministic() {
        let o = orchestrator();
        let first = o.analyze(SAMPLE);
        let second = o.analyze(SAMPLE);
        assert_eq!(first, second);
        for pair in first.windows(2) {
            assert!(pair[0].start_offset <= pair[1].start_offset);
        }
    }

    #[test]
    fn test_summary() {
        let summary = orchestrator().summarize(SAMPLE);
        assert_eq!(summary.count, 4);
        assert!(summary.any_found);
        assert_eq!(summary.records_by_category["CPF"], vec!["123.456.789-09".to_string()]);
        assert!(summary.mean_confidence > 0.9);
    }

    #[test]
    fn test_active_detector_restriction() {
        let config = DetectorConfig::default();
        let names = NameDictionary::builtin();
        let mut o = DetectionOrchestrator::new(&config, names.clone());
        o.set_active_detectors(&[DetectorKind::Email]);
        assert_eq!(o.active_detectors(), vec![DetectorKind::Email]);
        let records = o.analyze(SAMPLE);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::Email);

        let cpf_only = DetectionOrchestrator::new(
            &config.clone().with_detectors(&[DetectorKind::Cpf]),
            names,
        );
        assert_eq!(cpf_only.analyze(SAMPLE)[0].category, Category::Cpf);
    }

    #[test]
    fn test_recognizer_upgrades_overlapping_record() {
        let calls = Arc::new(AtomicUsize::new(0));
        let text = "Contato: joao@email.com";
        let o = orchestrator().with_recognizer(StubRecognizer {
            entities: vec![entity("email", "joao@email.com", 9, 23, 0.99)],
            available: true,
            calls: calls.clone(),
        });
        let records = o.analyze(text);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].detection_method.tag(),
            "hybrid(pattern+domain+external_model)"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recognizer_lower_score_keeps_method() {
        let text = "Contato: joao@email.com";
        let o = orchestrator().with_recognizer(StubRecognizer {
            entities: vec![entity("email", "joao@email.com", 9, 23, 0.5)],
            available: true,
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let records = o.analyze(text);
        assert_eq!(records[0].detection_method, DetectionMethod::PatternDomain);
    }

    #[test]
    fn test_recognizer_adds_non_overlapping_entities() {
        let text = "Passaporte FX123456 emitido em Lisboa";
        let o = orchestrator().with_recognizer(StubRecognizer {
            entities: vec![
                entity("passport number", "FX123456", 11, 19, 0.876543),
                entity("person", "bad", 30, 10, 0.9),
                entity("person", "out", 30, 400, 0.9),
            ],
            available: true,
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let records = o.analyze(text);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.category, Category::External("PASSAPORTE".to_string()));
        assert_eq!(r.detection_method, DetectionMethod::ExternalModel);
        assert_eq!(r.confidence, 0.877);
        assert!(!r.validated);
        assert_eq!(r.context_snippet, text);
    }

    #[test]
    fn test_unavailable_recognizer_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory_calls = Arc::new(AtomicUsize::new(0));
        let (c, f) = (calls.clone(), factory_calls.clone());
        let o = orchestrator().with_recognizer_factory(move || {
            f.fetch_add(1, Ordering::SeqCst);
            Some(Box::new(StubRecognizer {
                entities: vec![entity("person", "x", 0, 1, 1.0)],
                available: false,
                calls: c.clone(),
            }) as Box<dyn EntityRecognizer>)
        });
        o.analyze("texto qualquer");
        o.analyze("outro texto");
        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_recognizer_failure_keeps_stage_one() {
        let o = orchestrator().with_recognizer(FailingRecognizer);
        assert_eq!(o.analyze(SAMPLE).len(), 4);
    }

    #[test]
    fn test_fallback_only_when_nothing_found() {
        let calls = Arc::new(AtomicUsize::new(0));
        let o = orchestrator().with_classifier(classifier(0.92, &calls));

        let records = o.analyze(SAMPLE);
        assert_eq!(records.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let text = "Sou militante do partido e quero saber sobre a reunião";
        let records = o.analyze(text);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.category, Category::SubjectiveLlm);
        assert_eq!(r.raw_value, SUBJECTIVE_PLACEHOLDER);
        assert_eq!(r.start_offset, 0);
        assert_eq!(r.end_offset, text.chars().count());
        assert_eq!(r.confidence, 0.92);
        assert_eq!(r.detection_method.tag(), "generative_fallback:stub-model");
    }

    #[test]
    fn test_fallback_cutoff_and_failures() {
        let text = "quero saber sobre a reunião";
        let calls = Arc::new(AtomicUsize::new(0));
        assert!(orchestrator()
            .with_classifier(classifier(0.69, &calls))
            .analyze(text)
            .is_empty());
        assert_eq!(
            orchestrator()
                .with_classifier(classifier(0.70, &calls))
                .analyze(text)
                .len(),
            1
        );

        let records = orchestrator()
            .with_classifier(classifier(0.75, &calls))
            .analyze(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start_offset, 0);
        assert_eq!(records[0].end_offset, text.chars().count());
        assert_eq!(records[0].confidence, 0.75);
        assert!(orchestrator()
            .with_classifier(classifier(0.40, &calls))
            .analyze(text)
            .is_empty());

        let failing = StubClassifier {
            score: Err(()),
            active: true,
            calls: calls.clone(),
        };
        assert!(orchestrator().with_classifier(failing).analyze(text).is_empty());

        let inactive = StubClassifier {
            score: Ok(1.0),
            active: false,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        assert!(orchestrator().with_classifier(inactive).analyze(text).is_empty());
    }

    #[test]
    fn test_without_adapters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let o = orchestrator()
            .with_classifier(classifier(1.0, &calls))
            .without_adapters();
        assert!(o.analyze("quero saber sobre a reunião").is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_default_app_config() {
        let mut config = AppConfig::default();
        config.classifier.enabled = Some(false);
        let o = DetectionOrchestrator::from_app_config(&config).unwrap();
        assert_eq!(o.active_detectors().len(), 9);
        assert_eq!(o.analyze(SAMPLE).len(), 4);
    }
}
