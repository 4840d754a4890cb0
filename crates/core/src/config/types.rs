use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub sms: Option<SmsConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration for the staff endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Required when method = "api_key"
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("figaro.db")
}

/// Queue engine tuning and the service menu.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Flat fee added to the ticket price for priority customers.
    #[serde(default = "default_priority_surcharge")]
    pub priority_surcharge: u32,
    /// Duration assumed for services missing from the menu, in minutes.
    #[serde(default = "default_fallback_minutes")]
    pub fallback_service_minutes: u32,
    /// Minutes credited per waiting customer when estimates are rebuilt
    /// after a completion.
    #[serde(default = "default_slot_minutes")]
    pub completion_slot_minutes: u32,
    /// Service menu. Empty means "use the built-in menu".
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            priority_surcharge: default_priority_surcharge(),
            fallback_service_minutes: default_fallback_minutes(),
            completion_slot_minutes: default_slot_minutes(),
            services: Vec::new(),
        }
    }
}

fn default_priority_surcharge() -> u32 {
    100
}

fn default_fallback_minutes() -> u32 {
    20
}

fn default_slot_minutes() -> u32 {
    15
}

/// One service on the menu.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceEntry {
    pub name: String,
    pub price: u32,
    pub duration_minutes: u32,
}

/// SMS delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmsConfig {
    /// Delivery backend
    pub backend: SmsBackend,
    /// Twilio-specific configuration (required when backend = "twilio")
    #[serde(default)]
    pub twilio: Option<TwilioConfig>,
}

/// Available SMS backends
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SmsBackend {
    /// Log messages instead of sending them
    Log,
    Twilio,
}

/// Twilio REST API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number; a `whatsapp:` prefix switches delivery to WhatsApp.
    pub from_number: String,
    /// Country code prepended to numbers missing a leading `+`.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_sms_timeout")]
    pub timeout_secs: u32,
}

fn default_country_code() -> String {
    "+91".to_string()
}

fn default_sms_timeout() -> u32 {
    10
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: SanitizedQueueConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<SanitizedSmsConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQueueConfig {
    pub priority_surcharge: u32,
    pub fallback_service_minutes: u32,
    pub completion_slot_minutes: u32,
    pub service_count: usize,
}

/// Sanitized SMS config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSmsConfig {
    pub backend: String,
    pub twilio_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config.auth.api_key.is_some(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            queue: SanitizedQueueConfig {
                priority_surcharge: config.queue.priority_surcharge,
                fallback_service_minutes: config.queue.fallback_service_minutes,
                completion_slot_minutes: config.queue.completion_slot_minutes,
                service_count: config.queue.services.len(),
            },
            sms: config.sms.as_ref().map(|s| SanitizedSmsConfig {
                backend: match s.backend {
                    SmsBackend::Log => "log".to_string(),
                    SmsBackend::Twilio => "twilio".to_string(),
                },
                twilio_configured: s.twilio.is_some(),
            }),
        }
    }
}
