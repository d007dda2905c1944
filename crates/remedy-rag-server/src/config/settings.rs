use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub memory: MemoryConfig,
    pub embedding: EmbeddingConfig,
    pub knowledge: KnowledgeConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    pub directory: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

/// Where message records live.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Postgres,
    InMemory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    pub backend: StoreBackend,
    #[serde(default = "default_short_term_limit")]
    pub short_term_limit: usize,
    #[serde(default = "default_long_term_limit")]
    pub long_term_limit: usize,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeBackend {
    Pinecone,
    Disabled,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KnowledgeConfig {
    pub backend: KnowledgeBackend,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RagConfig {
    /// 0 disables context truncation
    #[serde(default)]
    pub max_context_tokens: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimitsConfig {
    pub embedding_concurrency: usize,
    pub llm_generate_concurrency: usize,
    pub acquire_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            embedding_concurrency: 16,
            llm_generate_concurrency: 8,
            acquire_timeout_ms: 5_000,
        }
    }
}

fn default_short_term_limit() -> usize {
    10
}

fn default_long_term_limit() -> usize {
    5
}

fn default_history_limit() -> usize {
    50
}

fn default_top_k() -> usize {
    3
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(true))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Parse settings from an inline TOML document, without env overrides.
    pub fn from_toml(source: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 5000

        [logging]
        directory = "logs"

        [database]
        url = "postgres://localhost/test"
        pool_max_size = 2
        pool_timeout_seconds = 5

        [memory]
        backend = "in_memory"

        [embedding]
        base_url = "http://localhost:8081"
        model = "test"
        dimension = 8
        timeout_seconds = 5

        [knowledge]
        backend = "disabled"
        timeout_seconds = 5

        [llm]
        base_url = "http://localhost:9000/v1"
        model = "test-model"
        system_prompt = "You are an Ayurvedic assistant."
        temperature = 0.6
        max_tokens = 256
        timeout_seconds = 10
    "#;

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_toml(MINIMAL).unwrap();

        assert_eq!(settings.memory.backend, StoreBackend::InMemory);
        assert_eq!(settings.memory.short_term_limit, 10);
        assert_eq!(settings.memory.long_term_limit, 5);
        assert_eq!(settings.memory.history_limit, 50);
        assert_eq!(settings.knowledge.top_k, 3);
        assert_eq!(settings.knowledge.backend, KnowledgeBackend::Disabled);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert_eq!(settings.rag.max_context_tokens, 0);
        assert_eq!(settings.limits.llm_generate_concurrency, 8);
    }

    #[test]
    fn test_missing_section_rejected() {
        let broken = MINIMAL.replace("[llm]", "[not_llm]");
        assert!(Settings::from_toml(&broken).is_err());
    }
}
