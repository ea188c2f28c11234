//! Random token generation for login flows
//!
//! Poll and login tokens are bearer secrets: whoever holds the poll token can
//! collect the credentials once the flow completes. They are therefore drawn
//! from the OS CSPRNG rather than a userspace generator.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

/// Number of random bytes behind every generated token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically secure random token.
///
/// # Returns
///
/// A URL-safe base64-encoded random token (43 characters)
///
/// # Panics
///
/// Panics if the OS random number generator fails. This indicates a critical
/// system failure (e.g., /dev/urandom unavailable) from which recovery is not
/// possible for security-sensitive operations.
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}
