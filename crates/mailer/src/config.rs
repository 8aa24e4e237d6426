use thiserror::Error;

pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";
pub const DEFAULT_CONSUMER_GROUP: &str = "mailer";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailerConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Mailer settings, read from the environment.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub sendgrid_api_url: String,
    pub sendgrid_api_key: String,
    pub from_email: String,
    /// Lowercased. Empty means every recipient is allowed.
    pub allowed_recipients: Vec<String>,
    pub redis_url: String,
    pub email_stream_key: String,
    pub consumer_group: String,
    pub consumer_name: String,
}

impl MailerConfig {
    pub fn from_env() -> Result<Self, MailerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, MailerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            sendgrid_api_url: get("SENDGRID_API_URL")
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            sendgrid_api_key: get("SENDGRID_API_KEY").ok_or(MailerConfigError::Missing("SENDGRID_API_KEY"))?,
            from_email: get("SENDGRID_FROM_EMAIL").ok_or(MailerConfigError::Missing("SENDGRID_FROM_EMAIL"))?,
            allowed_recipients: get("MAIL_ALLOWED_RECIPIENTS")
                .map(|raw| parse_recipients(&raw))
                .unwrap_or_default(),
            redis_url: get("REDIS_URL").unwrap_or_else(|| movierent_infra::config::DEFAULT_REDIS_URL.to_string()),
            email_stream_key: get("EMAIL_STREAM_KEY")
                .unwrap_or_else(|| movierent_infra::config::DEFAULT_EMAIL_STREAM_KEY.to_string()),
            consumer_group: DEFAULT_CONSUMER_GROUP.to_string(),
            consumer_name: get("MAILER_CONSUMER_NAME").unwrap_or_else(|| format!("mailer-{}", std::process::id())),
        })
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .collect()
}
