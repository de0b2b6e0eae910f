//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::Domain;
use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 3003;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
/// Embedding dimension of the default hashing embedder.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
/// Sentence model directory under the data root.
pub const DEFAULT_MODEL_SUBDIR: &str = "models/all-MiniLM-L6-v2";

/// Paths to all RagDesk data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
    /// Sentence model files (`data/models/all-MiniLM-L6-v2/`).
    pub model_dir: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            llm_config_file: root.join("llm-config.json"),
            model_dir: root.join(DEFAULT_MODEL_SUBDIR),
            root,
        })
    }

    /// Source document path for a domain (`data/salary.txt`, `data/insurance.txt`).
    pub fn domain_file(&self, domain: Domain) -> Option<PathBuf> {
        domain.source_file().map(|name| self.root.join(name))
    }
}

/// Optional paragraph chunking of domain documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Which embedding backend to start with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Sentence model when it loads, hashing embedder otherwise.
    #[default]
    Auto,
    /// Sentence model only; startup fails when it cannot be loaded.
    Onnx,
    Hashing,
}

impl std::str::FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "onnx" => Ok(Self::Onnx),
            "hashing" => Ok(Self::Hashing),
            other => Err(Error::Config(format!("unknown embedder: {other}"))),
        }
    }
}

/// Sampling overrides; `None` keeps the generator's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: Option<f64>,
    pub max_tokens: Option<usize>,
    pub top_p: Option<f64>,
}

/// Top-level RagDesk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagDeskConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Embedding dimension of the hashing embedder.
    pub embedding_dim: usize,
    pub embedder: EmbedderKind,
    /// Upper bound on one LLM completion, in seconds.
    pub llm_timeout_secs: u64,
    pub sampling: SamplingConfig,
    /// `None` keeps each domain document as a single retrievable unit.
    pub chunking: Option<ChunkingConfig>,
}

impl RagDeskConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_vars(data_dir, |key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_vars(
        data_dir: impl AsRef<Path>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let port = parse_var(&var, "PORT")?.unwrap_or(DEFAULT_PORT);
        let llm_timeout_secs =
            parse_var(&var, "RAGDESK_LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
        if llm_timeout_secs == 0 {
            return Err(Error::Config(
                "RAGDESK_LLM_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }

        let chunking = match parse_var::<usize>(&var, "RAGDESK_CHUNK_SIZE")? {
            Some(0) => {
                return Err(Error::Config(
                    "RAGDESK_CHUNK_SIZE must be greater than zero".into(),
                ))
            }
            Some(chunk_size) => {
                let chunk_overlap = parse_var(&var, "RAGDESK_CHUNK_OVERLAP")?
                    .unwrap_or(DEFAULT_CHUNK_OVERLAP)
                    .min(chunk_size / 2);
                Some(ChunkingConfig {
                    chunk_size,
                    chunk_overlap,
                })
            }
            None => None,
        };

        let sampling = SamplingConfig {
            temperature: parse_var(&var, "RAGDESK_TEMPERATURE")?,
            max_tokens: parse_var(&var, "RAGDESK_MAX_TOKENS")?,
            top_p: parse_var(&var, "RAGDESK_TOP_P")?,
        };
        if let Some(t) = sampling.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::Config(format!(
                    "RAGDESK_TEMPERATURE must be within 0..=2, got {t}"
                )));
            }
        }
        if let Some(p) = sampling.top_p {
            if !(p > 0.0 && p <= 1.0) {
                return Err(Error::Config(format!(
                    "RAGDESK_TOP_P must be within (0, 1], got {p}"
                )));
            }
        }
        if sampling.max_tokens == Some(0) {
            return Err(Error::Config(
                "RAGDESK_MAX_TOKENS must be greater than zero".into(),
            ));
        }

        let embedder: EmbedderKind = parse_var(&var, "RAGDESK_EMBEDDER")?.unwrap_or_default();
        let mut data_paths = DataPaths::new(data_dir)?;
        if let Some(dir) = var("RAGDESK_MODEL_DIR").filter(|d| !d.trim().is_empty()) {
            data_paths.model_dir = PathBuf::from(dir.trim());
        }

        Ok(Self {
            port,
            data_paths,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            embedder,
            llm_timeout_secs,
            sampling,
            chunking,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match var(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RagDeskConfig::from_vars(dir.path(), lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.llm_timeout_secs, DEFAULT_LLM_TIMEOUT_SECS);
        assert!(config.chunking.is_none());
        assert_eq!(
            config.data_paths.domain_file(Domain::Salary).unwrap(),
            dir.path().join("salary.txt")
        );
        assert!(config.data_paths.domain_file(Domain::Unknown).is_none());
    }

    #[test]
    fn test_chunking_from_vars() {
        let dir = TempDir::new().unwrap();
        let config = RagDeskConfig::from_vars(
            dir.path(),
            lookup(&[("RAGDESK_CHUNK_SIZE", "500"), ("PORT", "8080")]),
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.chunking,
            Some(ChunkingConfig {
                chunk_size: 500,
                chunk_overlap: 50
            })
        );
    }

    #[test]
    fn test_sampling_and_embedder_from_vars() {
        let dir = TempDir::new().unwrap();
        let config = RagDeskConfig::from_vars(
            dir.path(),
            lookup(&[
                ("RAGDESK_TEMPERATURE", "0.7"),
                ("RAGDESK_MAX_TOKENS", "256"),
                ("RAGDESK_TOP_P", "0.9"),
                ("RAGDESK_EMBEDDER", "Hashing"),
                ("RAGDESK_MODEL_DIR", "/opt/models/minilm"),
            ]),
        )
        .unwrap();
        assert_eq!(
            config.sampling,
            SamplingConfig {
                temperature: Some(0.7),
                max_tokens: Some(256),
                top_p: Some(0.9),
            }
        );
        assert_eq!(config.embedder, EmbedderKind::Hashing);
        assert_eq!(config.data_paths.model_dir, PathBuf::from("/opt/models/minilm"));
    }

    #[test]
    fn test_sampling_defaults_to_unset() {
        let dir = TempDir::new().unwrap();
        let config = RagDeskConfig::from_vars(dir.path(), lookup(&[])).unwrap();
        assert_eq!(config.sampling, SamplingConfig::default());
        assert_eq!(config.embedder, EmbedderKind::Auto);
        assert_eq!(config.data_paths.model_dir, dir.path().join(DEFAULT_MODEL_SUBDIR));
    }

    #[test]
    fn test_out_of_range_sampling_rejected() {
        let dir = TempDir::new().unwrap();
        for vars in [
            [("RAGDESK_TOP_P", "1.5")],
            [("RAGDESK_TOP_P", "0")],
            [("RAGDESK_TEMPERATURE", "3")],
            [("RAGDESK_MAX_TOKENS", "0")],
            [("RAGDESK_EMBEDDER", "bert")],
        ] {
            assert!(matches!(
                RagDeskConfig::from_vars(dir.path(), lookup(&vars)),
                Err(Error::Config(_))
            ));
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            RagDeskConfig::from_vars(dir.path(), lookup(&[("PORT", "not-a-port")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RagDeskConfig::from_vars(dir.path(), lookup(&[("RAGDESK_LLM_TIMEOUT_SECS", "0")])),
            Err(Error::Config(_))
        ));
    }
}
