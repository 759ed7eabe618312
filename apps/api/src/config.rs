use anyhow::{Context, Result};
use chrono::NaiveTime;

use crate::attendance::time_calc::AttendancePolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub session_ttl_secs: u64,
    pub bootstrap_consultant: Option<BootstrapConsultant>,
    /// Attendance policy applied to newly created companies.
    pub default_policy: AttendancePolicy,
}

#[derive(Debug, Clone)]
pub struct BootstrapConsultant {
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let bootstrap_consultant = match (
            std::env::var("BOOTSTRAP_CONSULTANT_EMAIL"),
            std::env::var("BOOTSTRAP_CONSULTANT_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapConsultant { email, password }),
            _ => None,
        };

        let work_start = optional_env("WORK_START", "09:00");
        let default_policy = AttendancePolicy {
            work_start: NaiveTime::parse_from_str(&work_start, "%H:%M")
                .with_context(|| format!("WORK_START '{work_start}' must be HH:MM"))?,
            late_grace_minutes: parse_env("LATE_GRACE_MINUTES", 15)?,
            half_day_minutes: parse_env("HALF_DAY_MINUTES", 240)?,
            full_day_minutes: parse_env("FULL_DAY_MINUTES", 480)?,
        };
        default_policy
            .validate()
            .context("Invalid default attendance policy")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
            session_ttl_secs: parse_env("SESSION_TTL_SECS", 8 * 60 * 60)?,
            bootstrap_consultant,
            default_policy,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
