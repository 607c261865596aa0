// Detection Module
// Personal-data detection organized into specialized submodules:
// - text_view / dedup: shared offset, context and overlap helpers
// - cpf, rg, phone, email, person_name, address, process_number, vehicle_plate, keyword: stage-1 detectors
// - recognizer / classifier: adapters over the external models
// - orchestrator: runs the three stages and builds summaries

pub mod address;
pub mod classifier;
pub mod cpf;
pub mod dedup;
pub mod email;
pub mod field_detector;
pub mod keyword;
pub mod orchestrator;
pub mod person_name;
pub mod phone;
pub mod process_number;
pub mod recognizer;
pub mod rg;
pub mod sensitivity;
pub mod text_view;
pub mod vehicle_plate;

// Re-export commonly used items
pub use classifier::{prefilter_bucket, ContentClassifier, GeminiClassifier};
pub use cpf::{is_denylisted, is_valid_cpf};
pub use dedup::{dedupe_by_confidence, dedupe_by_position};
pub use field_detector::{Detect, FieldDetector};
pub use orchestrator::{DetectionOrchestrator, FALLBACK_MIN_SCORE};
pub use recognizer::{
    all_labels,
    map_recognizer_label,
    EntityRecognizer,
    HttpEntityRecognizer,
    DEFAULT_RECOGNIZER_LABELS,
};
pub use sensitivity::{DetectorConfig, SensitivityThresholds};
