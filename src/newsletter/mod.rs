//! Newsletter signup relay.
//!
//! Serves a signup form and forwards each submission to a Mailchimp-compatible
//! mailing-list API, answering with a static success or failure page.
//!
//! # Environment Variables
//!
//! - `MAILCHIMP_API_KEY`: API key, `<key>-<data center>` (required)
//! - `MAILCHIMP_LIST_ID`: audience the subscriber is added to (required)
//! - `MAILCHIMP_API_BASE`: API root (default: `https://<data center>.api.mailchimp.com/3.0`)
//! - `SERVER_HOST`: host to bind to (default: 127.0.0.1)
//! - `PORT`: port to bind to (default: 3000)

pub mod client;
pub mod routes;

use std::env;

use crate::config::{parsed_or, required, ConfigError};

pub use client::{MailingListClient, SignupForm, SubscribeOutcome, SubscriberPayload};

#[derive(Debug, Clone)]
pub struct NewsletterConfig {
    pub api_key: String,
    pub list_id: String,
    pub api_base: String,
    pub server_host: String,
    pub server_port: u16,
}

impl NewsletterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, "MAILCHIMP_API_KEY")?;
        let api_base = match lookup("MAILCHIMP_API_BASE").filter(|base| !base.trim().is_empty()) {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => default_api_base(&api_key)?,
        };

        Ok(Self {
            list_id: required(&lookup, "MAILCHIMP_LIST_ID")?,
            api_key,
            api_base,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parsed_or(&lookup, "PORT", 3000)?,
        })
    }

    /// Endpoint that accepts batch member subscriptions for the configured list.
    pub fn list_url(&self) -> String {
        format!("{}/lists/{}", self.api_base, self.list_id)
    }
}

/// Mailchimp keys end in `-<data center>`, which selects the API host.
fn default_api_base(api_key: &str) -> Result<String, ConfigError> {
    match api_key.rsplit_once('-') {
        Some((_, dc)) if !dc.trim().is_empty() => Ok(format!("https://{}.api.mailchimp.com/3.0", dc.trim())),
        _ => Err(ConfigError::Invalid {
            key: "MAILCHIMP_API_KEY",
            value: "<redacted>".to_string(),
        }),
    }
}
