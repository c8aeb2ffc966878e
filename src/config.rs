use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::{
    application::handlers::message_dispatcher::{DEFAULT_POLL_INTERVAL_SECONDS, DispatcherConfig},
    domain::validation::{DEFAULT_MIN_LEAD_SECONDS, ValidationPolicy, WHATSAPP_CONTENT_LIMIT},
    infrastructure::messaging::{
        email::{DEFAULT_EMAIL_SUBJECT, DEFAULT_SMTP_PORT, SmtpConfig},
        whatsapp::{DEFAULT_WHATSAPP_API_BASE, WhatsappConfig},
    },
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("An error occured while getting {0} env param")]
    Missing(&'static str),
    #[error("An error occured while parsing {name} env param: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub poll_interval: Duration,
    pub min_lead: chrono::Duration,
    pub dispatch_concurrency: usize,
    pub whatsapp_content_limit: Option<usize>,
    pub email_content_limit: Option<usize>,
    pub whatsapp: Option<WhatsappConfig>,
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|name| var(name).ok())
    }

    /// Builds the configuration from any variable source; `try_parse` uses the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let poll_interval_seconds: u64 =
            env.parsed_or("POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECONDS)?;
        if poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        let min_lead_seconds: i64 = env.parsed_or("MIN_LEAD_SECONDS", DEFAULT_MIN_LEAD_SECONDS)?;
        let min_lead = chrono::Duration::try_seconds(min_lead_seconds)
            .filter(|lead| *lead >= chrono::Duration::zero())
            .ok_or_else(|| ConfigError::Invalid {
                name: "MIN_LEAD_SECONDS",
                value: min_lead_seconds.to_string(),
            })?;

        let whatsapp_content_limit =
            match env.parsed_or("WHATSAPP_CONTENT_LIMIT", WHATSAPP_CONTENT_LIMIT)? {
                0 => None,
                limit => Some(limit),
            };
        let email_content_limit = env.parsed::<usize>("EMAIL_CONTENT_LIMIT")?.filter(|l| *l > 0);

        Ok(Config {
            port: env.required_parsed("PORT")?,
            scheme: env.required("SCHEME")?,
            host: env.required("HOST")?,
            database_url: env.optional("DATABASE_URL"),
            database_max_connections: env.parsed_or("DATABASE_MAX_CONNECTIONS", 5)?,
            poll_interval: Duration::from_secs(poll_interval_seconds),
            min_lead,
            dispatch_concurrency: env.parsed_or("DISPATCH_CONCURRENCY", 1_usize)?.max(1),
            whatsapp_content_limit,
            email_content_limit,
            whatsapp: Self::whatsapp(&env),
            smtp: Self::smtp(&env)?,
        })
    }

    fn whatsapp<F>(env: &Env<F>) -> Option<WhatsappConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        Some(WhatsappConfig {
            api_base: env
                .optional("WHATSAPP_API_BASE")
                .unwrap_or_else(|| DEFAULT_WHATSAPP_API_BASE.to_string()),
            phone_number_id: env.optional("WHATSAPP_PHONE_ID")?,
            access_token: env.optional("WHATSAPP_API_TOKEN")?,
        })
    }

    fn smtp<F>(env: &Env<F>) -> Result<Option<SmtpConfig>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(host) = env.optional("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(SmtpConfig {
            host,
            port: env.parsed_or("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            username: env.required("SMTP_USERNAME")?,
            password: env.required("SMTP_PASSWORD")?,
            from: env.required("SMTP_FROM")?,
            subject: env
                .optional("SMTP_SUBJECT")
                .unwrap_or_else(|| DEFAULT_EMAIL_SUBJECT.to_string()),
        }))
    }

    pub fn server_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            min_lead: self.min_lead,
            whatsapp_content_limit: self.whatsapp_content_limit,
            email_content_limit: self.email_content_limit,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            poll_interval: self.poll_interval,
            max_concurrent_sends: self.dispatch_concurrency,
        }
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        self.optional(name)
            .map(|value| {
                value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
                    name,
                    value: value.clone(),
                })
            })
            .transpose()
    }

    fn parsed_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        Ok(self.parsed(name)?.unwrap_or(default))
    }

    fn required_parsed<T: FromStr>(&self, name: &'static str) -> Result<T, ConfigError> {
        self.parsed(name)?.ok_or(ConfigError::Missing(name))
    }
}
