//! SendGrid v3 mail API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::relay::{MailError, MailTransport, OutgoingMail};

#[derive(Clone)]
pub struct SendGridClient {
    client: Client,
    api_url: String,
    api_key: String,
    from_email: String,
}

impl SendGridClient {
    /// `api_url` is the API root, e.g. `https://api.sendgrid.com`.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, from_email: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            from_email: from_email.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v3/mail/send", self.api_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

fn request_body<'a>(from: &'a str, mail: &'a OutgoingMail) -> SendRequest<'a> {
    SendRequest {
        personalizations: [Personalization {
            to: [Address { email: &mail.to }],
        }],
        from: Address { email: from },
        subject: &mail.subject,
        content: [Content {
            kind: "text/plain",
            value: &mail.body,
        }],
    }
}

#[async_trait]
impl MailTransport for SendGridClient {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request_body(&self.from_email, mail))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "sendgrid responded");
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let mail = OutgoingMail {
            to: "jane@example.com".to_string(),
            subject: "Movie Rental Confirmation".to_string(),
            body: "hello".to_string(),
        };

        let json = serde_json::to_value(request_body("noreply@example.com", &mail)).unwrap();
        assert_eq!(json["personalizations"][0]["to"][0]["email"], "jane@example.com");
        assert_eq!(json["from"]["email"], "noreply@example.com");
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(json["content"][0]["value"], "hello");
    }

    #[test]
    fn endpoint_joins_api_root() {
        let client = SendGridClient::new("http://localhost:9000/", "key", "noreply@example.com");
        assert_eq!(client.endpoint(), "http://localhost:9000/v3/mail/send");
    }
}
