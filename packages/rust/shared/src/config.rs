//! Application configuration for Dossier.
//!
//! User config lives at `~/.dossier/dossier.toml`.
//! CLI flags override config file values, which override defaults.
//! Only the binary loads configuration; library crates receive the
//! relevant section at construction time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DossierError, Result};
use crate::types::Subject;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dossier.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dossier";

// ---------------------------------------------------------------------------
// Config structs (matching dossier.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding `extraction_metadata.json` and chunk output.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Chunking parameters.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Web fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Reference source endpoints.
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Extraction behavior.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Registered subjects.
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            chunking: ChunkingConfig::default(),
            fetch: FetchConfig::default(),
            reference: ReferenceConfig::default(),
            extraction: ExtractionConfig::default(),
            subjects: Vec::new(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent requests within one batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Responses larger than this are refused.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,

    /// Permit loopback/private hosts (mock servers, intranets).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            max_redirects: default_max_redirects(),
            max_response_bytes: default_max_response_bytes(),
            allow_private_hosts: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> u32 {
    4
}
fn default_max_redirects() -> usize {
    5
}
fn default_max_response_bytes() -> u64 {
    10 * 1024 * 1024
}

/// `[reference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// MediaWiki action API endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Prefix for canonical article URLs (title appended).
    #[serde(default = "default_article_base_url")]
    pub article_base_url: String,

    /// URLs containing this marker belong to the reference source.
    #[serde(default = "default_domain_marker")]
    pub domain_marker: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            article_base_url: default_article_base_url(),
            domain_marker: default_domain_marker(),
        }
    }
}

fn default_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}
fn default_article_base_url() -> String {
    "https://en.wikipedia.org/wiki/".into()
}
fn default_domain_marker() -> String {
    "wikipedia.org".into()
}

/// How per-source failures are treated and how reference articles are found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Look up the reference article by subject name; any failure aborts.
    Strict,
    /// Look up reference articles from request URLs; failing URLs are skipped.
    #[default]
    Batch,
}

/// `[extraction]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub mode: ExtractionMode,
}

impl AppConfig {
    /// Check values that would otherwise fail late, mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            return Err(DossierError::config("fetch.concurrency must be at least 1"));
        }

        for (key, value) in [
            ("reference.api_url", &self.reference.api_url),
            ("reference.article_base_url", &self.reference.article_base_url),
        ] {
            Url::parse(value)
                .map_err(|e| DossierError::config(format!("{key} is not a valid URL: {e}")))?;
        }

        if self.reference.domain_marker.trim().is_empty() {
            return Err(DossierError::config("reference.domain_marker must not be empty"));
        }

        Ok(())
    }

    /// Path to the data directory.
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dossier/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DossierError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dossier/dossier.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DossierError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| DossierError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DossierError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DossierError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DossierError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("chunk_size"));
        assert!(toml_str.contains("wikipedia.org"));
    }

    #[test]
    fn config_roundtrip() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.chunking.chunk_size, 1000);
        assert_eq!(parsed.chunking.chunk_overlap, 200);
        assert_eq!(parsed.extraction.mode, ExtractionMode::Batch);
    }

    #[test]
    fn config_with_subjects() {
        let toml_str = r#"
data_dir = "/tmp/dossier"

[extraction]
mode = "strict"

[[subjects]]
id = "turing"
name = "Alan Turing"
urls = ["https://en.wikipedia.org/wiki/Alan_Turing"]

[[subjects]]
id = "hopper"
name = "Grace Hopper"
reference_title = "Grace Brewster Hopper"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.subjects.len(), 2);
        assert_eq!(config.subjects[0].urls.len(), 1);
        assert_eq!(config.subjects[1].reference_title(), "Grace Brewster Hopper");
        assert_eq!(config.extraction.mode, ExtractionMode::Strict);
        assert_eq!(config.fetch.concurrency, 4);
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config.fetch.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn validate_rejects_bad_api_url() {
        let mut config = AppConfig::default();
        config.reference.api_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_from_file() {
        let dir = std::env::temp_dir().join(format!("dossier-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[chunking]\nchunk_size = 500\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 200);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
