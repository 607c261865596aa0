// Subjective content classifier
// Generative-model fallback scoring political, religious, health, union and identity content

use crate::services::config_store::ClassifierConfig;
use crate::services::providers::{extract_json, ProviderClient, ProviderError};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cheap gate: the model is only consulted when one of these appears
const PREFILTER_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "politica",
        &[
            "partido", "eleição", "voto", "candidato", "lula", "bolsonaro", "esquerda", "direita",
            "comunista", "fascista", "socialismo", "militante", "ideologia",
        ],
    ),
    (
        "religiao",
        &[
            "deus", "igreja", "fé", "religião", "crença", "bíblia", "biblia", "culto", "pastor",
            "padre", "bênção", "espírita", "umbanda", "candomblé", "evangélico", "católico",
        ],
    ),
    (
        "saude",
        &[
            "doença", "doente", "enfermo", "paciente", "tratamento", "dor", "remédio",
            "medicamento", "câncer", "hiv", "aids", "depressão", "ansiedade", "terapia", "laudo",
            "atestado", "cid", "diagnóstico", "sintoma",
        ],
    ),
    (
        "sindicato",
        &["sindicato", "sindical", "greve", "assembleia", "filiado", "associação de classe"],
    ),
    (
        "sexualidade_etnia",
        &[
            "gay", "lésbica", "homossexual", "trans", "travesti", "lgbt", "orientação sexual",
            "negro", "pardo", "preto", "indígena", "raça", "etnia",
        ],
    ),
];

/// Name of the first pre-filter bucket with a keyword in `text` (substring match)
pub fn prefilter_bucket(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    PREFILTER_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(bucket, _)| *bucket)
}

fn build_prompt(text: &str) -> String {
    format!(
        "Você classifica pedidos de acesso à informação quanto a dados pessoais sensíveis.\n\
         Avalie se o texto abaixo revela, sobre uma pessoa identificável, alguma destas informações: \
         opinião política, crença religiosa ou filosófica, filiação sindical, dados de saúde \
         (doenças, sintomas, tratamentos), orientação sexual ou origem racial/étnica.\n\n\
         Texto:\n\"\"\"{}\"\"\"\n\n\
         Responda somente com um objeto JSON, sem markdown: {{\"score\": <número entre 0.0 e 1.0>}}",
        text
    )
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

/// Score from a model reply; anything unparsable counts as 0.0
pub fn parse_score(content: &str) -> f64 {
    let parsed = extract_json(content)
        .and_then(|json| {
            serde_json::from_str::<ScoreResponse>(&json)
                .map_err(|e| ProviderError::JsonError(e.to_string()))
        });
    match parsed {
        Ok(r) if r.score.is_finite() => r.score.clamp(0.0, 1.0),
        Ok(_) => 0.0,
        Err(e) => {
            warn!("[classifier] Unparsable reply ({}): {:.200}", e, content);
            0.0
        }
    }
}

/// Run `call`, retrying rate-limit failures up to `max_retries` times with a fixed pause
pub(crate) fn with_rate_limit_retry<T, F>(
    max_retries: u32,
    backoff: Duration,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Result<T, ProviderError>,
{
    let mut attempt = 0;
    loop {
        match call() {
            Err(e) if e.is_rate_limit() && attempt < max_retries => {
                attempt += 1;
                warn!(
                    "[classifier] Rate limited, retry {}/{} in {}s",
                    attempt,
                    max_retries,
                    backoff.as_secs()
                );
                std::thread::sleep(backoff);
            }
            other => return other,
        }
    }
}

pub trait ContentClassifier: Send + Sync {
    fn is_active(&self) -> bool;

    fn model_name(&self) -> &str;

    /// Sensitivity score in [0, 1]
    fn score(&self, text: &str) -> Result<f64, ProviderError>;
}

pub struct GeminiClassifier {
    client: ProviderClient,
    api_key: Option<String>,
    model: String,
    max_length: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl GeminiClassifier {
    pub fn new(client: ProviderClient, api_key: Option<String>, config: &ClassifierConfig) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            max_length: config.max_length,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
        }
    }

    pub fn from_config(
        config: &ClassifierConfig,
        api_key: Option<String>,
        proxy: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let mut client = ProviderClient::new(None, proxy)?;
        if let Some(endpoint) = config.endpoint.as_deref() {
            client = client.with_gemini_url(endpoint);
        }
        let classifier = Self::new(client, api_key, config);
        if classifier.is_active() {
            info!("[classifier] Generative fallback active with model {}", classifier.model);
        } else {
            warn!("[classifier] No API key configured, generative fallback disabled");
        }
        Ok(classifier)
    }

    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.max_length) {
            Some((byte, _)) => &text[..byte],
            None => text,
        }
    }
}

impl ContentClassifier for GeminiClassifier {
    fn is_active(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn score(&self, text: &str) -> Result<f64, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        if text.trim().is_empty() {
            return Ok(0.0);
        }

        let text = self.truncate(text);
        let Some(bucket) = prefilter_bucket(text) else {
            debug!("[classifier] No candidate keywords, skipping model call");
            return Ok(0.0);
        };
        debug!("[classifier] Pre-filter matched bucket {}", bucket);

        let prompt = build_prompt(text);
        let result = with_rate_limit_retry(self.max_retries, self.retry_backoff, || {
            self.client.call_gemini(&self.model, api_key, &prompt)
        });

        match result {
            Ok(reply) => {
                debug!("[classifier] Reply in {}ms", reply.latency_ms);
                Ok(parse_score(&reply.content))
            }
            // Blocked or empty candidates
            Err(ProviderError::MissingContent) => Ok(0.0),
            Err(e) => Err(e),
        }
    }
}
