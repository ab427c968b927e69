//! Server configuration read from the environment.
//!
//! [`load_dotenv`] merges a `.env` file into the process environment (if one
//! exists). [`telemetry_config`] reads `LOG_FORMAT` so logging can start, and
//! [`AppConfig::from_env`] then reads every other setting. Numeric retrieval
//! settings fall back to their defaults with a warning; anything else that
//! does not parse is a startup error.

use std::path::PathBuf;

use docqa_rag::config::{DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_K};
use docqa_rag::RagConfig;
use docqa_telemetry::{LogFormat, TelemetryConfig};
use tracing::{debug, warn};

use crate::error::{Result, ServerError};

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MILVUS_ADDR: &str = "http://localhost:19530";
pub const DEFAULT_COLLECTION_NAME: &str = "documents";
pub const SERVICE_NAME: &str = "docqa-server";

/// Credentials and model names for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Only Qwen lets the endpoint be overridden.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilvusSettings {
    pub addr: String,
    pub username: String,
    pub password: String,
    pub collection_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server_addr: String,
    /// `ark`, `openai`, `qwen`, `mock` or `none`.
    pub chat_model_type: String,
    /// `ark`, `openai`, `qwen` or `mock`.
    pub embedding_model_type: String,
    pub ark: ProviderSettings,
    pub openai: ProviderSettings,
    pub qwen: ProviderSettings,
    /// `milvus` or `memory`.
    pub vector_db_type: String,
    pub milvus: MilvusSettings,
    /// `fixed` or `recursive`.
    pub splitter: String,
    pub rag: RagConfig,
    pub upload_dir: PathBuf,
}

/// Merge `.env` into the environment. Returns the file used, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) => {
            debug!(error = %e, "no .env file loaded");
            None
        }
    }
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let chunk_size = parse_usize("CHUNK_SIZE", get("CHUNK_SIZE"), 1000)?;
        let chunk_overlap = parse_usize("CHUNK_OVERLAP", get("CHUNK_OVERLAP"), 200)?;
        let rag = RagConfig::builder()
            .chunk_size(chunk_size)
            .chunk_overlap(chunk_overlap)
            .top_k(top_k(get("MILVUS_TOPK")))
            .similarity_threshold(similarity_threshold(get("MILVUS_SIMILARITY_THRESHOLD")))
            .build()?;

        Ok(Self {
            server_addr: or("SERVER_ADDR", DEFAULT_SERVER_ADDR),
            chat_model_type: or("CHAT_MODEL_TYPE", "ark").to_ascii_lowercase(),
            embedding_model_type: or("EMBEDDING_MODEL_TYPE", "ark").to_ascii_lowercase(),
            ark: ProviderSettings {
                api_key: or("ARK_KEY", ""),
                chat_model: or("ARK_CHAT_MODEL", ""),
                embedding_model: or("ARK_EMBEDDING_MODEL", ""),
                base_url: None,
            },
            openai: ProviderSettings {
                api_key: or("OPENAI_KEY", ""),
                chat_model: or("OPENAI_CHAT_MODEL", docqa_model::openai::DEFAULT_OPENAI_CHAT_MODEL),
                embedding_model: or(
                    "OPENAI_EMBEDDING_MODEL",
                    docqa_rag::openai::DEFAULT_OPENAI_EMBEDDING_MODEL,
                ),
                base_url: None,
            },
            qwen: ProviderSettings {
                api_key: or("QWEN_KEY", ""),
                chat_model: or("QWEN_CHAT_MODEL", ""),
                embedding_model: or("QWEN_EMBEDDING_MODEL", ""),
                base_url: Some(or("QWEN_BASE_URL", docqa_rag::openai::QWEN_API_BASE)),
            },
            vector_db_type: or("VECTOR_DB_TYPE", "milvus").to_ascii_lowercase(),
            milvus: MilvusSettings {
                addr: or("MILVUS_ADDR", DEFAULT_MILVUS_ADDR),
                username: or("MILVUS_USERNAME", ""),
                password: or("MILVUS_PASSWORD", ""),
                collection_name: or("MILVUS_COLLECTION_NAME", DEFAULT_COLLECTION_NAME),
            },
            splitter: or("SPLITTER", "fixed").to_ascii_lowercase(),
            rag,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("docqa-uploads")),
        })
    }
}

/// Logging setup from the process environment. Read before
/// [`AppConfig::from_env`] so its fallback warnings are not lost.
pub fn telemetry_config() -> Result<TelemetryConfig> {
    telemetry_from_lookup(|key| std::env::var(key).ok())
}

pub fn telemetry_from_lookup<F>(lookup: F) -> Result<TelemetryConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let format = lookup("LOG_FORMAT")
        .unwrap_or_default()
        .parse::<LogFormat>()
        .map_err(|e| ServerError::Config(format!("LOG_FORMAT: {e}")))?;
    Ok(TelemetryConfig::new(SERVICE_NAME).with_format(format))
}

fn parse_usize(key: &str, value: Option<String>, default: usize) -> Result<usize> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ServerError::Config(format!("{key} must be a non-negative integer, got '{raw}'"))),
    }
}

fn similarity_threshold(value: Option<String>) -> f32 {
    let Some(raw) = value else {
        return DEFAULT_SIMILARITY_THRESHOLD;
    };
    match raw.parse::<f32>() {
        Ok(t) if (0.0..=1.0).contains(&t) => t,
        _ => {
            warn!(value = %raw, default = DEFAULT_SIMILARITY_THRESHOLD, "invalid MILVUS_SIMILARITY_THRESHOLD, using default");
            DEFAULT_SIMILARITY_THRESHOLD
        }
    }
}

fn top_k(value: Option<String>) -> usize {
    let Some(raw) = value else {
        return DEFAULT_TOP_K;
    };
    match raw.parse::<i64>() {
        Ok(k) if k > 0 => k as usize,
        _ => {
            warn!(value = %raw, default = DEFAULT_TOP_K, "invalid MILVUS_TOPK, using default");
            DEFAULT_TOP_K
        }
    }
}
