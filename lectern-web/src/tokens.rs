//! Token material for sessions and login codes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Generate an opaque bearer session token (256 bits, URL-safe base64).
#[must_use]
pub fn session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a one-time login code (128 bits, URL-safe base64).
#[must_use]
pub fn login_code() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = session_token();
        let b = session_token();
        assert_ne!(a, b);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
        assert_eq!(a.len(), 43); // 32 bytes, base64 without padding
    }

    #[test]
    fn login_codes_are_shorter_than_session_tokens() {
        assert!(login_code().len() < session_token().len());
    }
}
