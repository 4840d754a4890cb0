//! Twilio REST API SMS sender.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::TwilioConfig;

use super::SmsSender;

/// Sends messages through the Twilio Messages API. When the configured
/// sender number carries a `whatsapp:` prefix, recipients get the same
/// prefix and delivery goes over WhatsApp.
pub struct TwilioSmsSender {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioSmsSender {
    pub fn new(config: TwilioConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        )
    }

    /// E.164-normalize a raw phone number, then match the sender's
    /// transport prefix.
    fn normalize_recipient(&self, raw: &str) -> String {
        let normalized = normalize_e164(raw, &self.config.default_country_code);
        if self.config.from_number.starts_with("whatsapp:") {
            format!("whatsapp:{normalized}")
        } else {
            normalized
        }
    }
}

/// Strip formatting characters and ensure a leading country code.
/// Ten-digit numbers get the configured default country code; anything
/// else without a `+` gets one prepended as-is.
fn normalize_e164(raw: &str, default_country_code: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if cleaned.starts_with('+') {
        cleaned
    } else if cleaned.len() == 10 {
        format!("{default_country_code}{cleaned}")
    } else {
        format!("+{cleaned}")
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(&self, phone: &str, message: &str) -> bool {
        let to = self.normalize_recipient(phone);

        let result = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(to, "sms delivered");
                true
            }
            Ok(response) => {
                tracing::warn!(to, status = %response.status(), "twilio rejected message");
                false
            }
            Err(e) => {
                tracing::warn!(to, error = %e, "twilio request failed");
                false
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "twilio"
    }
}
