use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Session store. Holds `session:<token>` keys with a TTL.
    pub redis: RedisClient,
    pub s3: S3Client,
    /// Text generation backend. `LlmClient` in production.
    pub llm: Arc<dyn TextGenerator>,
    pub config: Config,
}
