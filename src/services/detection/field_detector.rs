// Field detectors
// The fixed set of stage-1 detectors behind one `detect` capability

use super::address::AddressDetector;
use super::cpf::CpfDetector;
use super::email::EmailDetector;
use super::keyword::KeywordDetector;
use super::person_name::PersonNameDetector;
use super::phone::PhoneDetector;
use super::process_number::ProcessNumberDetector;
use super::rg::RgDetector;
use super::sensitivity::DetectorConfig;
use super::vehicle_plate::VehiclePlateDetector;
use crate::models::{DetectionRecord, DetectorKind};
use crate::services::word_list::NameDictionary;

/// Scan text and return non-overlapping records at or above the detector's threshold
pub trait Detect {
    fn detect(&self, text: &str) -> Vec<DetectionRecord>;
}

#[derive(Debug, Clone)]
pub enum FieldDetector {
    Cpf(CpfDetector),
    Rg(RgDetector),
    Phone(PhoneDetector),
    Email(EmailDetector),
    PersonName(PersonNameDetector),
    Address(AddressDetector),
    ProcessNumber(ProcessNumberDetector),
    VehiclePlate(VehiclePlateDetector),
    Keyword(KeywordDetector),
}

impl FieldDetector {
    pub fn build(kind: DetectorKind, config: &DetectorConfig, names: &NameDictionary) -> Self {
        let threshold = config.threshold(kind);
        match kind {
            DetectorKind::Cpf => Self::Cpf(CpfDetector::new(threshold)),
            DetectorKind::Rg => Self::Rg(RgDetector::new(threshold)),
            DetectorKind::Phone => Self::Phone(PhoneDetector::new(threshold)),
            DetectorKind::Email => Self::Email(EmailDetector::new(threshold)),
            DetectorKind::PersonName => {
                Self::PersonName(PersonNameDetector::new(threshold, names.clone()))
            }
            DetectorKind::Address => Self::Address(AddressDetector::new(threshold)),
            DetectorKind::ProcessNumber => {
                Self::ProcessNumber(ProcessNumberDetector::new(threshold))
            }
            DetectorKind::VehiclePlate => Self::VehiclePlate(VehiclePlateDetector::new(threshold)),
            DetectorKind::Keyword => Self::Keyword(KeywordDetector::new(threshold)),
        }
    }

    /// One detector per kind, in canonical order
    pub fn all(config: &DetectorConfig, names: &NameDictionary) -> Vec<Self> {
        DetectorKind::ALL
            .iter()
            .map(|kind| Self::build(*kind, config, names))
            .collect()
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            Self::Cpf(_) => DetectorKind::Cpf,
            Self::Rg(_) => DetectorKind::Rg,
            Self::Phone(_) => DetectorKind::Phone,
            Self::Email(_) => DetectorKind::Email,
            Self::PersonName(_) => DetectorKind::PersonName,
            Self::Address(_) => DetectorKind::Address,
            Self::ProcessNumber(_) => DetectorKind::ProcessNumber,
            Self::VehiclePlate(_) => DetectorKind::VehiclePlate,
            Self::Keyword(_) => DetectorKind::Keyword,
        }
    }
}

impl Detect for FieldDetector {
    fn detect(&self, text: &str) -> Vec<DetectionRecord> {
        match self {
            Self::Cpf(d) => d.detect(text),
            Self::Rg(d) => d.detect(text),
            Self::Phone(d) => d.detect(text),
            Self::Email(d) => d.detect(text),
            Self::PersonName(d) => d.detect(text),
            Self::Address(d) => d.detect(text),
            Self::ProcessNumber(d) => d.detect(text),
            Self::VehiclePlate(d) => d.detect(text),
            Self::Keyword(d) => d.detect(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use proptest::prelude::*;

    #[test]
    fn test_build_all_in_canonical_order() {
        let detectors = FieldDetector::all(&DetectorConfig::default(), &NameDictionary::builtin());
        let kinds: Vec<_> = detectors.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, DetectorKind::ALL.to_vec());
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        for detector in FieldDetector::all(&DetectorConfig::default(), &NameDictionary::builtin()) {
            assert!(detector.detect("").is_empty(), "{:?}", detector.kind());
        }
    }

    proptest! {
        #[test]
        fn prop_records_are_well_formed_and_disjoint(
            text in "[0-9A-Za-z .,:/()@+-]{0,80}|(CPF|RG|tel|CEP|SEI|placa|meu laudo) [0-9 ./-]{0,20}",
        ) {
            let config = DetectorConfig::default();
            let names = NameDictionary::builtin();
            let char_len = text.chars().count();
            for detector in FieldDetector::all(&config, &names) {
                let records = detector.detect(&text);
                for r in &records {
                    prop_assert!(r.start_offset < r.end_offset);
                    prop_assert!(r.end_offset <= char_len);
                    prop_assert!((0.0..=1.0).contains(&r.confidence));
                    prop_assert!(r.confidence >= config.threshold(detector.kind()));
                }
                // Address subtypes are resolved independently; every other
                // detector's records are disjoint across categories
                let mut groups: std::collections::BTreeMap<Option<Category>, Vec<_>> = Default::default();
                for r in records {
                    let key = (detector.kind() == DetectorKind::Address).then(|| r.category.clone());
                    groups.entry(key).or_default().push(r);
                }
                for group in groups.values() {
                    for (i, a) in group.iter().enumerate() {
                        for b in &group[i + 1..] {
                            prop_assert!(!a.overlaps(b.start_offset, b.end_offset));
                        }
                    }
                }
            }
        }
    }
}
