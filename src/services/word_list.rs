// Word List Service
// Diacritic-insensitive word sets used by the person-name detector

use super::config_store::ConfigError;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Membership test over a fixed vocabulary
pub trait WordList: Send + Sync {
    fn contains(&self, word: &str) -> bool;
}

/// Lowercase and strip Portuguese/Latin diacritics (`João` -> `joao`)
pub fn fold_diacritics(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            'ý' | 'ÿ' => 'y',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FoldedWordSet {
    words: HashSet<String>,
}

impl FoldedWordSet {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.extend(words);
        set
    }

    /// Load a JSON array of strings
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let words: Vec<String> =
            serde_json::from_str(&content).map_err(|e| ConfigError::json(path, e))?;
        info!("[word_list] Loaded {} words from {}", words.len(), path.display());
        Ok(Self::new(words))
    }

    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let folded = fold_diacritics(word.as_ref().trim());
            if !folded.is_empty() {
                self.words.insert(folded);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl WordList for FoldedWordSet {
    fn contains(&self, word: &str) -> bool {
        self.words.contains(&fold_diacritics(word.trim()))
    }
}

const BUILTIN_FIRST_NAMES: &[&str] = &[
    "ana", "antonio", "adriana", "alexandre", "aline", "amanda", "andre", "beatriz", "bruna",
    "bruno", "camila", "carla", "carlos", "claudia", "cristina", "daniel", "daniela", "diego",
    "eduardo", "fabio", "felipe", "fernanda", "fernando", "francisco", "gabriel", "gabriela",
    "guilherme", "gustavo", "helena", "isabela", "joao", "jose", "juliana", "julia", "larissa",
    "leonardo", "leticia", "lucas", "luciana", "luis", "luiz", "marcelo", "marco", "marcos", "maria",
    "mariana", "mateus", "patricia", "paulo", "pedro", "rafael", "renata", "ricardo", "roberto",
    "rodrigo", "sandra", "sergio", "tatiana", "thiago", "vanessa", "vinicius",
];

const BUILTIN_SURNAMES: &[&str] = &[
    "silva", "santos", "oliveira", "souza", "sousa", "rodrigues", "ferreira", "alves", "pereira",
    "lima", "gomes", "costa", "ribeiro", "martins", "carvalho", "almeida", "lopes", "soares",
    "fernandes", "vieira", "barbosa", "rocha", "dias", "nascimento", "andrade", "moreira",
    "nunes", "marques", "machado", "mendes", "freitas", "cardoso", "ramos", "goncalves",
    "santana", "teixeira", "araujo", "moura", "correia", "cavalcanti", "batista", "campos",
    "monteiro", "pinto", "reis", "castro", "miranda", "azevedo",
];

/// First-name and surname vocabularies shared across detector instances
#[derive(Clone)]
pub struct NameDictionary {
    pub first_names: Arc<dyn WordList>,
    pub surnames: Arc<dyn WordList>,
}

impl NameDictionary {
    pub fn new(first_names: Arc<dyn WordList>, surnames: Arc<dyn WordList>) -> Self {
        Self { first_names, surnames }
    }

    /// Compact list of common Brazilian first names and surnames
    pub fn builtin() -> Self {
        Self::new(
            Arc::new(FoldedWordSet::new(BUILTIN_FIRST_NAMES.iter().copied())),
            Arc::new(FoldedWordSet::new(BUILTIN_SURNAMES.iter().copied())),
        )
    }

    /// Replace each built-in list whose file path is configured
    pub fn load(first_names: Option<&Path>, surnames: Option<&Path>) -> Result<Self, ConfigError> {
        let mut dictionary = Self::builtin();
        if let Some(path) = first_names {
            dictionary.first_names = Arc::new(FoldedWordSet::from_json_file(path)?);
        }
        if let Some(path) = surnames {
            dictionary.surnames = Arc::new(FoldedWordSet::from_json_file(path)?);
        }
        Ok(dictionary)
    }

    pub fn is_first_name(&self, word: &str) -> bool {
        self.first_names.contains(word)
    }

    pub fn is_surname(&self, word: &str) -> bool {
        self.surnames.contains(word)
    }
}

impl std::fmt::Debug for NameDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameDictionary").finish_non_exhaustive()
    }
}

impl Default for NameDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}
