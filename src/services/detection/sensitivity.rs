// Sensitivity thresholds
// Per-detector minimum confidence a record needs before it is emitted.

use crate::models::DetectorKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityThresholds {
    #[serde(default = "default_cpf")]
    pub cpf: f64,
    #[serde(default = "default_rg")]
    pub rg: f64,
    #[serde(default = "default_phone")]
    pub phone: f64,
    #[serde(default = "default_email")]
    pub email: f64,
    #[serde(default = "default_name")]
    pub name: f64,
    #[serde(default = "default_address")]
    pub address: f64,
    #[serde(default = "default_process_number")]
    pub process_number: f64,
    #[serde(default = "default_vehicle_plate")]
    pub vehicle_plate: f64,
    #[serde(default = "default_keyword")]
    pub keyword: f64,
}

fn default_cpf() -> f64 { 0.80 }
fn default_rg() -> f64 { 0.75 }
fn default_phone() -> f64 { 0.75 }
fn default_email() -> f64 { 0.85 }
fn default_name() -> f64 { 0.70 }
fn default_address() -> f64 { 0.80 }
fn default_process_number() -> f64 { 0.70 }
fn default_vehicle_plate() -> f64 { 0.85 }
fn default_keyword() -> f64 { 0.65 }

impl Default for SensitivityThresholds {
    fn default() -> Self {
        Self {
            cpf: default_cpf(),
            rg: default_rg(),
            phone: default_phone(),
            email: default_email(),
            name: default_name(),
            address: default_address(),
            process_number: default_process_number(),
            vehicle_plate: default_vehicle_plate(),
            keyword: default_keyword(),
        }
    }
}

impl SensitivityThresholds {
    pub fn for_kind(&self, kind: DetectorKind) -> f64 {
        match kind {
            DetectorKind::Cpf => self.cpf,
            DetectorKind::Rg => self.rg,
            DetectorKind::Phone => self.phone,
            DetectorKind::Email => self.email,
            DetectorKind::PersonName => self.name,
            DetectorKind::Address => self.address,
            DetectorKind::ProcessNumber => self.process_number,
            DetectorKind::VehiclePlate => self.vehicle_plate,
            DetectorKind::Keyword => self.keyword,
        }
    }

    /// Values outside [0, 1] are clamped
    pub fn set(&mut self, kind: DetectorKind, value: f64) {
        let value = value.clamp(0.0, 1.0);
        let slot = match kind {
            DetectorKind::Cpf => &mut self.cpf,
            DetectorKind::Rg => &mut self.rg,
            DetectorKind::Phone => &mut self.phone,
            DetectorKind::Email => &mut self.email,
            DetectorKind::PersonName => &mut self.name,
            DetectorKind::Address => &mut self.address,
            DetectorKind::ProcessNumber => &mut self.process_number,
            DetectorKind::VehiclePlate => &mut self.vehicle_plate,
            DetectorKind::Keyword => &mut self.keyword,
        };
        *slot = value;
    }
}

/// Stage-1 configuration: thresholds plus the detectors that run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    #[serde(default)]
    pub thresholds: SensitivityThresholds,
    #[serde(default = "default_enabled_detectors")]
    pub enabled_detectors: Vec<DetectorKind>,
}

fn default_enabled_detectors() -> Vec<DetectorKind> {
    DetectorKind::ALL.to_vec()
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            thresholds: SensitivityThresholds::default(),
            enabled_detectors: default_enabled_detectors(),
        }
    }
}

impl DetectorConfig {
    pub fn with_threshold(mut self, kind: DetectorKind, value: f64) -> Self {
        self.thresholds.set(kind, value);
        self
    }

    pub fn with_detectors(mut self, kinds: &[DetectorKind]) -> Self {
        self.enabled_detectors = kinds.to_vec();
        self
    }

    pub fn threshold(&self, kind: DetectorKind) -> f64 {
        self.thresholds.for_kind(kind)
    }

    pub fn is_enabled(&self, kind: DetectorKind) -> bool {
        self.enabled_detectors.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = SensitivityThresholds::default();
        assert_eq!(t.for_kind(DetectorKind::Cpf), 0.80);
        assert_eq!(t.for_kind(DetectorKind::VehiclePlate), 0.85);
        assert_eq!(t.for_kind(DetectorKind::Keyword), 0.65);
    }

    #[test]
    fn test_with_threshold_overrides_one_kind() {
        let config = DetectorConfig::default().with_threshold(DetectorKind::Email, 0.5);
        assert_eq!(config.threshold(DetectorKind::Email), 0.5);
        assert_eq!(config.threshold(DetectorKind::Phone), 0.75);

        let clamped = DetectorConfig::default().with_threshold(DetectorKind::Rg, 3.0);
        assert_eq!(clamped.threshold(DetectorKind::Rg), 1.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{"thresholds":{"cpf":0.9},"enabledDetectors":["cpf","vehiclePlate"]}"#)
                .unwrap();
        assert_eq!(config.threshold(DetectorKind::Cpf), 0.9);
        assert_eq!(config.threshold(DetectorKind::PersonName), 0.70);
        assert!(config.is_enabled(DetectorKind::VehiclePlate));
        assert!(!config.is_enabled(DetectorKind::Email));
    }
}
