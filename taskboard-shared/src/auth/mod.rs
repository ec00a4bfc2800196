/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`token`]: Opaque bearer token generation, storage, and validation
/// - [`middleware`]: Axum middleware resolving tokens to an [`middleware::AuthContext`]
/// - [`access`]: Board-level permission checks
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Bearer Tokens**: Secure random generation with SHA-256 hashing at rest
/// - **Constant-time Comparison**: All verification uses constant-time operations

pub mod access;
pub mod middleware;
pub mod password;
pub mod token;
