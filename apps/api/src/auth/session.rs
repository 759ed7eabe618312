//! Redis-backed bearer sessions.

use redis::AsyncCommands;
use tracing::debug;
use uuid::Uuid;

use crate::auth::roles::CurrentUser;
use crate::errors::AppError;

const SESSION_PREFIX: &str = "session:";

/// 64 hex characters from two random v4 UUIDs.
pub fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn session_key(token: &str) -> String {
    format!("{SESSION_PREFIX}{token}")
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || !is_well_formed(token) {
        return None;
    }
    Some(token)
}

fn is_well_formed(token: &str) -> bool {
    token.len() == 64 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

pub async fn create_session(
    redis: &redis::Client,
    user: &CurrentUser,
    ttl_secs: u64,
) -> Result<String, AppError> {
    let token = new_token();
    let payload = serde_json::to_string(user)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode session: {e}")))?;
    let mut conn = redis.get_multiplexed_async_connection().await?;
    conn.set_ex::<_, _, ()>(session_key(&token), payload, ttl_secs)
        .await?;
    debug!("Session created for user {}", user.user_id);
    Ok(token)
}

/// Loads the session for a token. Unknown or expired tokens are `Unauthorized`.
pub async fn load_session(redis: &redis::Client, token: &str) -> Result<CurrentUser, AppError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let payload: Option<String> = conn.get(session_key(token)).await?;
    let payload = payload.ok_or(AppError::Unauthorized)?;
    serde_json::from_str(&payload).map_err(|e| {
        tracing::warn!("Discarding unreadable session payload: {e}");
        AppError::Unauthorized
    })
}

pub async fn delete_session(redis: &redis::Client, token: &str) -> Result<(), AppError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    conn.del::<_, ()>(session_key(token)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_is_64_hex() {
        let token = new_token();
        assert_eq!(token.len(), 64);
        assert!(is_well_formed(&token));
        assert_ne!(token, new_token());
    }

    #[test]
    fn test_parse_bearer() {
        let token = new_token();
        assert_eq!(parse_bearer(&format!("Bearer {token}")), Some(token.as_str()));
        assert_eq!(parse_bearer(&format!("bearer  {token} ")), Some(token.as_str()));
        assert_eq!(parse_bearer(&format!("Basic {token}")), None);
        assert_eq!(parse_bearer("Bearer short"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer(""), None);
    }

    #[test]
    fn test_session_key_prefix() {
        assert_eq!(session_key("abc"), "session:abc");
    }
}
