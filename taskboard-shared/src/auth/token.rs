/// Opaque bearer tokens for session authentication
///
/// Login hands the client a random token; only its SHA-256 hash is kept
/// in the `auth_tokens` table, so a database leak exposes no usable
/// credentials. Every login issues a fresh token and logout revokes the
/// one presented.
///
/// # Security
///
/// - **Format**: 40 random alphanumeric chars (base62)
/// - **Storage**: SHA-256 hash, hex-encoded
/// - **Validation**: Constant-time comparison to prevent timing attacks
///
/// # Schema
///
/// ```sql
/// CREATE TABLE auth_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_hash CHAR(64) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::token::{generate_token, hash_token, verify_token};
///
/// let (token, hash) = generate_token();
/// assert_eq!(token.len(), 40);
/// assert_eq!(hash, hash_token(&token));
/// assert!(verify_token(&token, &hash));
/// ```

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

/// Length of a plaintext token (characters)
pub const TOKEN_LENGTH: usize = 40;

/// Generates a new bearer token
///
/// Returns the plaintext to hand to the client together with the
/// SHA-256 hash to store. Key space is 62^40, well past brute force.
pub fn generate_token() -> (String, String) {
    let token = generate_random_string(TOKEN_LENGTH);
    let hash = hash_token(&token);

    (token, hash)
}

/// Generates a random alphanumeric string
///
/// Base62 (A-Z, a-z, 0-9), safe to carry in headers unescaped.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes a token with SHA-256, hex-encoded (64 characters)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Validates a plaintext token against a stored hash
///
/// Uses constant-time comparison to prevent timing side channels.
pub fn verify_token(token: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_token(token);
    constant_time_compare(&computed_hash, stored_hash)
}

/// Constant-time string comparison
///
/// Always compares the full length and accumulates differences with
/// bitwise OR instead of short-circuiting.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut result = 0u8;
    for i in 0..a_bytes.len() {
        result |= a_bytes[i] ^ b_bytes[i];
    }

    result == 0
}

/// A stored token record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    /// Token ID
    pub id: Uuid,

    /// User the token authenticates
    pub user_id: Uuid,

    /// SHA-256 hex of the plaintext token
    pub token_hash: String,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Issues a fresh token for a user
    ///
    /// Returns the stored record and the plaintext for the client.
    /// Existing tokens stay valid, so concurrent sessions keep working.
    pub async fn issue(pool: &PgPool, user_id: Uuid) -> Result<(Self, String), sqlx::Error> {
        let (token, hash) = generate_token();

        let record = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (user_id, token_hash)
            VALUES ($1, $2)
            RETURNING id, user_id, token_hash, created_at
            "#,
        )
        .bind(user_id)
        .bind(hash)
        .fetch_one(pool)
        .await?;

        Ok((record, token))
    }

    /// Resolves a plaintext token to the user it authenticates
    ///
    /// Looks up by hash, then re-verifies with a constant-time compare.
    /// Returns `None` for unknown or revoked tokens.
    pub async fn authenticate(pool: &PgPool, token: &str) -> Result<Option<Uuid>, sqlx::Error> {
        let hash = hash_token(token);

        let record = sqlx::query_as::<_, AuthToken>(
            r#"
            SELECT id, user_id, token_hash, created_at
            FROM auth_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(&hash)
        .fetch_optional(pool)
        .await?;

        Ok(record
            .filter(|r| verify_token(token, r.token_hash.trim()))
            .map(|r| r.user_id))
    }

    /// Revokes a token by its plaintext
    ///
    /// Returns true if a token was deleted.
    pub async fn revoke(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
        let hash = hash_token(token);

        let result = sqlx::query("DELETE FROM auth_tokens WHERE token_hash = $1")
            .bind(hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes every token a user holds
    ///
    /// Used when an account is deleted or a password changes.
    pub async fn revoke_all(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token() {
        let (token1, hash1) = generate_token();
        let (token2, hash2) = generate_token();

        assert_eq!(token1.len(), TOKEN_LENGTH);
        assert!(token1.chars().all(|c| c.is_alphanumeric()));

        // Randomness
        assert_ne!(token1, token2);
        assert_ne!(hash1, hash2);

        // SHA-256 hex is 64 chars
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_token_deterministic() {
        let hash1 = hash_token("some-token");
        let hash2 = hash_token("some-token");
        let hash3 = hash_token("other-token");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_verify_token() {
        let (token, hash) = generate_token();

        assert!(verify_token(&token, &hash));
        assert!(!verify_token("not-the-token", &hash));
        assert!(!verify_token("", &hash));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));

        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hello2"));
        assert!(!constant_time_compare("short", "longer string"));
    }
}
