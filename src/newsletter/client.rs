use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::NewsletterConfig;

/// Fields posted by the signup form.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
    #[serde(rename = "fName")]
    pub first_name: String,
    #[serde(rename = "lName")]
    pub last_name: String,
    pub email: String,
}

/// Batch-subscribe body understood by the mailing-list API.
#[derive(Debug, Serialize)]
pub struct SubscriberPayload {
    pub members: Vec<Member>,
}

#[derive(Debug, Serialize)]
pub struct Member {
    pub email_address: String,
    pub status: &'static str,
    pub merge_fields: MergeFields,
}

#[derive(Debug, Serialize)]
pub struct MergeFields {
    #[serde(rename = "FNAME")]
    pub first_name: String,
    #[serde(rename = "LNAME")]
    pub last_name: String,
}

impl From<&SignupForm> for SubscriberPayload {
    fn from(form: &SignupForm) -> Self {
        Self {
            members: vec![Member {
                email_address: form.email.clone(),
                status: "subscribed",
                merge_fields: MergeFields {
                    first_name: form.first_name.clone(),
                    last_name: form.last_name.clone(),
                },
            }],
        }
    }
}

/// Result of one relay attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// The API answered exactly 200.
    Subscribed,
    /// The API answered with any other status.
    Rejected(StatusCode),
    /// The request never got a response.
    Unreachable(String),
}

/// Thin client for the mailing-list API. One attempt per call, no retry.
#[derive(Clone)]
pub struct MailingListClient {
    http: reqwest::Client,
    list_url: String,
    api_key: String,
}

impl MailingListClient {
    pub fn new(config: &NewsletterConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            list_url: config.list_url(),
            api_key: config.api_key.clone(),
        }
    }

    pub async fn subscribe(&self, form: &SignupForm) -> SubscribeOutcome {
        let payload = SubscriberPayload::from(form);
        let response = self
            .http
            .post(&self.list_url)
            .basic_auth("anystring", Some(&self.api_key))
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::OK => SubscribeOutcome::Subscribed,
            Ok(response) => SubscribeOutcome::Rejected(response.status()),
            Err(e) => SubscribeOutcome::Unreachable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let form = SignupForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        };

        let payload = serde_json::to_value(SubscriberPayload::from(&form)).unwrap();
        assert_eq!(
            payload,
            json!({
                "members": [{
                    "email_address": "ada@example.com",
                    "status": "subscribed",
                    "merge_fields": { "FNAME": "Ada", "LNAME": "Lovelace" }
                }]
            })
        );
    }

    #[test]
    fn test_form_field_names() {
        let form: SignupForm =
            serde_json::from_value(json!({ "fName": "Ada", "lName": "Lovelace", "email": "ada@example.com" }))
                .unwrap();
        assert_eq!(form.first_name, "Ada");
        assert_eq!(form.last_name, "Lovelace");
    }

    #[actix_rt::test]
    async fn test_unreachable_api() {
        let config = NewsletterConfig {
            api_key: "key-us4".to_string(),
            list_id: "abc".to_string(),
            api_base: "http://127.0.0.1:1/3.0".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
        };
        let client = MailingListClient::new(&config);
        let form = SignupForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        };

        assert!(matches!(client.subscribe(&form).await, SubscribeOutcome::Unreachable(_)));
    }
}
