// DadoScan Core Services

pub mod config_store;
pub mod providers;
pub mod word_list;
pub mod detection;

pub use config_store::*;
pub use providers::*;
pub use word_list::{fold_diacritics, FoldedWordSet, NameDictionary, WordList};

// Re-export detection entry points
pub use detection::{
    DetectionOrchestrator,
    DetectorConfig,
    SensitivityThresholds,
    Detect,
    FieldDetector,
    EntityRecognizer,
    HttpEntityRecognizer,
    ContentClassifier,
    GeminiClassifier,
};
