use serde::Deserialize;

/// Main configuration for the compare service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// S3 configuration
    pub s3: S3Config,
    /// Rekognition configuration
    #[serde(default)]
    pub rekognition: RekognitionConfig,
    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// S3 template storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Bucket every template image is written to and listed from
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
}

/// Rekognition face comparison configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RekognitionConfig {
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Minimum similarity (0-100) for a face match to be reported.
    /// Rekognition applies its own default when unset.
    pub similarity_threshold: Option<f32>,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Allowed CORS origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

// Default value functions
fn default_service_name() -> String {
    "compare-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with default values
            .set_default("service.name", "compare-service")?
            .set_default("service.log_level", "info")?
            // Add config file if present
            .add_source(config::File::with_name("config/compare").required(false))
            .add_source(config::File::with_name("/etc/facematch/compare").required(false))
            // Override with environment variables
            .add_source(environment_source())
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }
}

/// Environment variable source.
///
/// COMPARE__S3__BUCKET -> s3.bucket
/// COMPARE__API__CORS_ORIGINS=https://a.example,https://b.example -> api.cors_origins
fn environment_source() -> config::Environment {
    config::Environment::with_prefix("COMPARE")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("api.cors_origins")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RekognitionConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
            similarity_threshold: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
        }
    }
}
