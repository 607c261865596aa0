// Dadoscan Data Models
// Detection records, categories, methods and the summary handed to reporting code

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Characters kept on each side of a span in `DetectionRecord::context_snippet`
pub const DEFAULT_CONTEXT_WINDOW: usize = 50;

/// Placeholder value of the whole-text record produced by the generative fallback
pub const SUBJECTIVE_PLACEHOLDER: &str = "[Conteúdo sensível detectado por IA]";

// ============ Detector Kinds ============

/// The nine pattern detectors run in stage 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectorKind {
    Cpf,
    Rg,
    Phone,
    Email,
    PersonName,
    Address,
    ProcessNumber,
    VehiclePlate,
    Keyword,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 9] = [
        DetectorKind::Cpf,
        DetectorKind::Rg,
        DetectorKind::Phone,
        DetectorKind::Email,
        DetectorKind::PersonName,
        DetectorKind::Address,
        DetectorKind::ProcessNumber,
        DetectorKind::VehiclePlate,
        DetectorKind::Keyword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Rg => "rg",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::PersonName => "personName",
            Self::Address => "address",
            Self::ProcessNumber => "processNumber",
            Self::VehiclePlate => "vehiclePlate",
            Self::Keyword => "keyword",
        }
    }
}

// ============ Categories ============

/// Semantic buckets of the contextual keyword detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordBucket {
    Health,
    Social,
    Sensitive,
    Minor,
    ImplicitDocument,
    Registration,
    AdministrativeSensitive,
    Financial,
}

impl KeywordBucket {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Health => "CONTEXTO_SAUDE",
            Self::Social => "CONTEXTO_SOCIAL",
            Self::Sensitive => "CONTEXTO_SENSIVEL",
            Self::Minor => "CONTEXTO_MENOR",
            Self::ImplicitDocument => "CONTEXTO_DOC_IMPLICITO",
            Self::Registration => "CONTEXTO_CADASTRO",
            Self::AdministrativeSensitive => "CONTEXTO_ADM_SENSIVEL",
            Self::Financial => "CONTEXTO_FINANCEIRO",
        }
    }

    /// Buckets that keep full confidence next to statistics wording
    pub fn exempt_from_generic_penalty(&self) -> bool {
        matches!(self, Self::Health | Self::Sensitive)
    }

    const ALL: [KeywordBucket; 8] = [
        Self::Health,
        Self::Social,
        Self::Sensitive,
        Self::Minor,
        Self::ImplicitDocument,
        Self::Registration,
        Self::AdministrativeSensitive,
        Self::Financial,
    ];
}

/// Detector type plus subtype of a record, serialized as its tag (`CPF`, `ENDERECO_CEP`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Category {
    Cpf,
    Rg,
    Phone,
    Email,
    PersonName,
    AddressPostalCode,
    AddressStreet,
    ProcessSei,
    ProcessProtocol,
    ProcessOccurrence,
    ProcessCda,
    VehiclePlate,
    Keyword(KeywordBucket),
    SubjectiveLlm,
    /// Recognizer labels with no native category (CNPJ, PASSAPORTE, ...)
    External(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cpf => "CPF",
            Self::Rg => "RG",
            Self::Phone => "TELEFONE",
            Self::Email => "EMAIL",
            Self::PersonName => "NOME",
            Self::AddressPostalCode => "ENDERECO_CEP",
            Self::AddressStreet => "ENDERECO_LOGRADOURO",
            Self::ProcessSei => "PROCESSO_SEI",
            Self::ProcessProtocol => "PROCESSO_PROTOCOLO",
            Self::ProcessOccurrence => "PROCESSO_OCORRENCIA",
            Self::ProcessCda => "PROCESSO_CDA",
            Self::VehiclePlate => "PLACA_VEICULO",
            Self::Keyword(bucket) => bucket.tag(),
            Self::SubjectiveLlm => "SUBJETIVO_LLM",
            Self::External(tag) => tag.as_str(),
        }
    }

    /// Parse a tag; anything unknown is kept verbatim as `External`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "CPF" => Self::Cpf,
            "RG" => Self::Rg,
            "TELEFONE" => Self::Phone,
            "EMAIL" => Self::Email,
            "NOME" => Self::PersonName,
            "ENDERECO_CEP" => Self::AddressPostalCode,
            "ENDERECO_LOGRADOURO" => Self::AddressStreet,
            "PROCESSO_SEI" => Self::ProcessSei,
            "PROCESSO_PROTOCOLO" => Self::ProcessProtocol,
            "PROCESSO_OCORRENCIA" => Self::ProcessOccurrence,
            "PROCESSO_CDA" => Self::ProcessCda,
            "PLACA_VEICULO" => Self::VehiclePlate,
            "SUBJETIVO_LLM" => Self::SubjectiveLlm,
            other => KeywordBucket::ALL
                .iter()
                .find(|b| b.tag() == other)
                .map(|b| Self::Keyword(*b))
                .unwrap_or_else(|| Self::External(other.to_string())),
        }
    }

    /// Category family used to group summary entries: the tag up to its first `_`
    pub fn family(&self) -> &str {
        let tag = self.as_str();
        tag.split('_').next().unwrap_or(tag)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        Category::from_tag(&tag)
    }
}

// ============ Detection Methods ============

/// Which pass produced a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DetectionMethod {
    Pattern,
    PatternValidation,
    PatternContext,
    PatternAreaCode,
    PatternDomain,
    PatternDictionary,
    PlatePattern,
    Keyword,
    ExternalModel,
    GenerativeFallback { model: String },
    /// A pattern record confirmed by the external recognizer with a higher score
    Hybrid(Box<DetectionMethod>),
}

impl DetectionMethod {
    pub fn tag(&self) -> String {
        match self {
            Self::Pattern => "pattern".to_string(),
            Self::PatternValidation => "pattern+validation".to_string(),
            Self::PatternContext => "pattern+context".to_string(),
            Self::PatternAreaCode => "pattern+area_code".to_string(),
            Self::PatternDomain => "pattern+domain".to_string(),
            Self::PatternDictionary => "pattern+dictionary".to_string(),
            Self::PlatePattern => "plate_pattern".to_string(),
            Self::Keyword => "keyword".to_string(),
            Self::ExternalModel => "external_model".to_string(),
            Self::GenerativeFallback { model } => format!("generative_fallback:{}", model),
            Self::Hybrid(base) => format!("hybrid({}+external_model)", base.tag()),
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        if let Some(inner) = tag
            .strip_prefix("hybrid(")
            .and_then(|rest| rest.strip_suffix("+external_model)"))
        {
            return Self::parse(inner).map(|base| Self::Hybrid(Box::new(base)));
        }
        if let Some(model) = tag.strip_prefix("generative_fallback:") {
            return Some(Self::GenerativeFallback {
                model: model.to_string(),
            });
        }
        let method = match tag {
            "pattern" => Self::Pattern,
            "pattern+validation" => Self::PatternValidation,
            "pattern+context" => Self::PatternContext,
            "pattern+area_code" => Self::PatternAreaCode,
            "pattern+domain" => Self::PatternDomain,
            "pattern+dictionary" => Self::PatternDictionary,
            "plate_pattern" => Self::PlatePattern,
            "keyword" => Self::Keyword,
            "external_model" => Self::ExternalModel,
            _ => return None,
        };
        Some(method)
    }

    /// Upgrade to the hybrid form; already-hybrid methods are left as they are
    pub fn into_hybrid(self) -> Self {
        match self {
            Self::Hybrid(_) => self,
            base => Self::Hybrid(Box::new(base)),
        }
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self, Self::Hybrid(_))
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl From<DetectionMethod> for String {
    fn from(method: DetectionMethod) -> Self {
        method.tag()
    }
}

impl TryFrom<String> for DetectionMethod {
    type Error = String;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        DetectionMethod::parse(&tag).ok_or_else(|| format!("unknown detection method: {}", tag))
    }
}

// ============ Detection Record ============

/// One flagged span. Offsets are character offsets, end-exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub category: Category,
    pub raw_value: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub confidence: f64,
    pub validated: bool,
    pub detection_method: DetectionMethod,
    pub context_snippet: String,
}

impl DetectionRecord {
    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open-interval intersection of the two spans
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start_offset.max(start) < self.end_offset.min(end)
    }
}

// ============ Recognizer Output ============

/// Entity returned by the external entity-recognition model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedEntity {
    pub label: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub score: f64,
}

// ============ Summary ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub count: usize,
    pub any_found: bool,
    /// Category family -> raw values, in text order
    pub records_by_category: BTreeMap<String, Vec<String>>,
    pub mean_confidence: f64,
    pub records: Vec<DetectionRecord>,
}

impl DetectionSummary {
    pub fn from_records(records: Vec<DetectionRecord>) -> Self {
        let mut records_by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for record in &records {
            records_by_category
                .entry(record.category.family().to_string())
                .or_default()
                .push(record.raw_value.clone());
        }

        let mean_confidence = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.confidence).sum::<f64>() / records.len() as f64
        };

        Self {
            count: records.len(),
            any_found: !records.is_empty(),
            records_by_category,
            mean_confidence,
            records,
        }
    }
}
