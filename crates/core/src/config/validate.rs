use super::{
    types::{Config, SmsBackend},
    ConfigError,
};
use crate::config::AuthMethod;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - api_key present when auth method = "api_key"
/// - Service menu entries have non-empty names and non-zero durations
/// - Twilio section present and complete when sms backend = "twilio"
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method is \"api_key\"".to_string(),
        ));
    }

    for service in &config.queue.services {
        if service.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "queue.services entries must have a non-empty name".to_string(),
            ));
        }
        if service.duration_minutes == 0 {
            return Err(ConfigError::ValidationError(format!(
                "queue.services entry \"{}\" must have a non-zero duration",
                service.name
            )));
        }
    }

    if let Some(ref sms) = config.sms {
        if sms.backend == SmsBackend::Twilio {
            let twilio = sms.twilio.as_ref().ok_or_else(|| {
                ConfigError::ValidationError(
                    "sms.twilio must be set when sms.backend is \"twilio\"".to_string(),
                )
            })?;
            if twilio.account_sid.is_empty()
                || twilio.auth_token.is_empty()
                || twilio.from_number.is_empty()
            {
                return Err(ConfigError::ValidationError(
                    "sms.twilio requires account_sid, auth_token and from_number".to_string(),
                ));
            }
        }
    }

    Ok(())
}
