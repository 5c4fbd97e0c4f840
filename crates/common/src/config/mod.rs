//! Configuration management for PaperGraph
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/<env>, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model collaborator
    #[serde(default)]
    pub llm: LlmConfig,

    /// Bibliographic search collaborator
    #[serde(default)]
    pub scholar: ScholarConfig,

    /// Graph behaviour and layout geometry
    #[serde(default)]
    pub graph: GraphConfig,

    /// Relationship analysis limits
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted document upload in bytes
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider: ollama, mock
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Base URL of the chat endpoint
    #[serde(default = "default_llm_url")]
    pub api_url: String,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transport failure
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,

    /// Temperature for concept extraction
    #[serde(default = "default_concept_temperature")]
    pub concept_temperature: f32,

    /// Temperature for relationship classification
    #[serde(default = "default_relationship_temperature")]
    pub relationship_temperature: f32,

    /// Temperature for relationship chat
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
}

impl LlmConfig {
    /// Longest a single completion may take, every retry and backoff included
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = u64::from(self.max_retries) + 1;
        let backoff: Duration = (1..=self.max_retries).map(llm_retry_delay).sum();
        Duration::from_secs(self.timeout_secs * attempts) + backoff
    }
}

/// Backoff before retry `attempt` (1-based) of a language model request
pub fn llm_retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(250 * 2_u64.pow(attempt))
}

/// Headroom kept between the slowest expansion and the server timeout
const REQUEST_TIMEOUT_HEADROOM: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScholarConfig {
    /// Graph API base URL
    #[serde(default = "default_scholar_base")]
    pub api_base: String,

    /// Optional API key (sent as x-api-key)
    pub api_key: Option<String>,

    /// Number of references requested per paper
    #[serde(default = "default_reference_limit")]
    pub reference_limit: usize,

    /// Maximum citation nodes added per expansion
    #[serde(default = "default_max_citation_nodes")]
    pub max_citation_nodes: usize,

    /// Request timeout in seconds
    #[serde(default = "default_scholar_timeout")]
    pub timeout_secs: u64,
}

/// What a repeated expansion of the same paper does with the previous cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionPolicy {
    /// Keep earlier concept/citation clusters and add a fresh one
    #[default]
    Append,
    /// Drop the earlier cluster before adding the fresh one
    Replace,
}

/// Layout rank direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum LayoutDirection {
    /// Top to bottom
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    /// Left to right
    #[serde(rename = "LR")]
    LeftRight,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub expansion_policy: ExpansionPolicy,

    #[serde(default)]
    pub direction: LayoutDirection,

    #[serde(default = "default_node_width")]
    pub node_width: f64,

    #[serde(default = "default_node_height")]
    pub node_height: f64,

    /// Gap between nodes of the same rank
    #[serde(default = "default_node_sep")]
    pub node_sep: f64,

    /// Gap between ranks
    #[serde(default = "default_rank_sep")]
    pub rank_sep: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Character budget for assembled citation evidence
    #[serde(default = "default_max_context")]
    pub max_context_length: usize,

    /// Maximum citation chunks kept per analysis
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_upload() -> usize { 25 * 1024 * 1024 }
fn default_llm_provider() -> String { "ollama".to_string() }
fn default_llm_url() -> String { "http://localhost:11434".to_string() }
fn default_llm_model() -> String { crate::DEFAULT_LLM_MODEL.to_string() }
fn default_llm_timeout() -> u64 { 90 }
fn default_llm_retries() -> u32 { 1 }
fn default_concept_temperature() -> f32 { 0.3 }
fn default_relationship_temperature() -> f32 { 0.2 }
fn default_chat_temperature() -> f32 { 0.7 }
fn default_scholar_base() -> String { "https://api.semanticscholar.org/graph/v1".to_string() }
fn default_reference_limit() -> usize { 20 }
fn default_max_citation_nodes() -> usize { 10 }
fn default_scholar_timeout() -> u64 { 15 }
fn default_node_width() -> f64 { 280.0 }
fn default_node_height() -> f64 { 200.0 }
fn default_node_sep() -> f64 { 100.0 }
fn default_rank_sep() -> f64 { 150.0 }
fn default_max_context() -> usize { 2000 }
fn default_max_chunks() -> usize { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "papergraph".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_url: default_llm_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
            concept_temperature: default_concept_temperature(),
            relationship_temperature: default_relationship_temperature(),
            chat_temperature: default_chat_temperature(),
        }
    }
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            api_base: default_scholar_base(),
            api_key: None,
            reference_limit: default_reference_limit(),
            max_citation_nodes: default_max_citation_nodes(),
            timeout_secs: default_scholar_timeout(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            expansion_policy: ExpansionPolicy::default(),
            direction: LayoutDirection::default(),
            node_width: default_node_width(),
            node_height: default_node_height(),
            node_sep: default_node_sep(),
            rank_sep: default_rank_sep(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_context_length: default_max_context(),
            max_chunks: default_max_chunks(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__LLM__MODEL=llama3.1:8b
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Longest an expansion can wait on collaborators: one completion and
    /// one reference lookup
    pub fn collaborator_budget(&self) -> Duration {
        self.llm.worst_case_duration() + Duration::from_secs(self.scholar.timeout_secs)
    }

    /// Server request timeout. Never shorter than the collaborator budget,
    /// so the model gives up before the request does.
    pub fn request_timeout(&self) -> Duration {
        let configured = Duration::from_secs(self.server.request_timeout_secs);
        configured.max(self.collaborator_budget() + REQUEST_TIMEOUT_HEADROOM)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            scholar: ScholarConfig::default(),
            graph: GraphConfig::default(),
            analysis: AnalysisConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
