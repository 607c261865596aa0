// External entity recognizer
// Adapter over a zero-shot NER inference service and the label -> category mapping

use crate::models::{Category, RecognizedEntity};
use crate::services::config_store::RecognizerConfig;
use crate::services::providers::{ProviderClient, ProviderError};
use tracing::{debug, info, warn};

/// Labels requested when none are configured
pub const DEFAULT_RECOGNIZER_LABELS: &[&str] = &[
    "person",
    "cpf",
    "cnpj",
    "phone number",
    "mobile phone number",
    "email",
    "email address",
    "address",
    "postal code",
    "date of birth",
    "identity card number",
    "driver's license number",
    "credit card number",
    "bank account number",
];

const LABEL_MAP: &[(&str, &str)] = &[
    ("person", "NOME"),
    ("name", "NOME"),
    ("cpf", "CPF"),
    ("cnpj", "CNPJ"),
    ("phone number", "TELEFONE"),
    ("mobile phone number", "TELEFONE"),
    ("landline phone number", "TELEFONE"),
    ("fax number", "TELEFONE"),
    ("email", "EMAIL"),
    ("email address", "EMAIL"),
    ("address", "ENDERECO_LOGRADOURO"),
    ("postal code", "ENDERECO_CEP"),
    ("identity card number", "RG"),
    ("national id number", "RG"),
    ("identity document number", "RG"),
    ("passport number", "PASSAPORTE"),
    ("driver's license number", "CNH"),
    ("credit card number", "CARTAO_CREDITO"),
    ("bank account number", "CONTA_BANCARIA"),
    ("iban", "IBAN"),
    ("health insurance number", "PLANO_SAUDE"),
    ("health insurance id number", "PLANO_SAUDE"),
    ("medical condition", "DADOS_SAUDE"),
    ("medication", "DADOS_SAUDE"),
    ("blood type", "DADOS_SAUDE"),
    ("date of birth", "DATA_NASCIMENTO"),
    ("social security number", "INSS"),
    ("tax identification number", "CPF"),
    ("username", "USUARIO"),
    ("ip address", "IP"),
    ("license plate number", "PLACA_VEICULO"),
];

/// Map a recognizer label to a category; unknown labels become an upper-snake tag
pub fn map_recognizer_label(label: &str) -> Category {
    let normalized = label.trim().to_lowercase();
    match LABEL_MAP.iter().find(|(l, _)| *l == normalized) {
        Some((_, tag)) => Category::from_tag(tag),
        None => Category::from_tag(&normalized.to_uppercase().replace([' ', '-', '\''], "_")),
    }
}

/// Every label with a known mapping
pub fn all_labels() -> Vec<String> {
    LABEL_MAP.iter().map(|(l, _)| l.to_string()).collect()
}

pub trait EntityRecognizer: Send + Sync {
    /// Whether the backing model can serve requests
    fn is_available(&self) -> bool;

    /// Entities with char offsets into `text`
    fn detect(&self, text: &str, labels: &[String]) -> Result<Vec<RecognizedEntity>, ProviderError>;
}

pub struct HttpEntityRecognizer {
    client: ProviderClient,
    endpoint: String,
    threshold: f64,
}

impl HttpEntityRecognizer {
    pub fn new(client: ProviderClient, endpoint: impl Into<String>, threshold: f64) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            threshold,
        }
    }

    pub fn from_config(config: &RecognizerConfig, proxy: Option<&str>) -> Result<Self, ProviderError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ProviderError::MissingEndpoint)?;
        let client = ProviderClient::new(Some(config.timeout_secs), proxy)?;
        info!("[recognizer] Using entity-recognition endpoint {}", endpoint);
        Ok(Self::new(client, endpoint, config.threshold))
    }
}

impl EntityRecognizer for HttpEntityRecognizer {
    fn is_available(&self) -> bool {
        let ok = self.client.probe(&self.endpoint);
        if !ok {
            warn!("[recognizer] Health probe failed for {}", self.endpoint);
        }
        ok
    }

    fn detect(&self, text: &str, labels: &[String]) -> Result<Vec<RecognizedEntity>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let entities = self
            .client
            .call_recognizer(&self.endpoint, text, labels, self.threshold)?;
        debug!("[recognizer] {} entities returned", entities.len());
        Ok(entities)
    }
}
