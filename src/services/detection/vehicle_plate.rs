// Vehicle plate detector
// Legacy (ABC-1234) and Mercosul (ABC1D23) plates

use super::dedup::dedupe_by_position;
use super::text_view::{compile, TextView};
use super::Detect;
use crate::models::{Category, DetectionMethod, DetectionRecord};
use regex::Regex;
use std::sync::OnceLock;

/// Uppercase only, so ordinary words followed by a year ("ano 2024") never match
const PATTERN: &str = r"\b[A-Z]{3}[- ]?\d{4}\b|\b[A-Z]{3}[- ]?\d[A-Z]\d{2}\b";

const PLATE_CONFIDENCE: f64 = 1.0;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(PATTERN))
}

#[derive(Debug, Clone)]
pub struct VehiclePlateDetector {
    threshold: f64,
}

impl VehiclePlateDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detect for VehiclePlateDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        if PLATE_CONFIDENCE < self.threshold {
            return Vec::new();
        }
        let view = TextView::new(text);
        let found = pattern()
            .find_iter(text)
            .map(|m| {
                view.record(
                    Category::VehiclePlate,
                    m.start(),
                    m.end(),
                    PLATE_CONFIDENCE,
                    false,
                    DetectionMethod::PlatePattern,
                )
            })
            .collect();

        dedupe_by_position(found)
    }
}
