use ring::hmac;

/// Signs a payload with HMAC-SHA256, returning the tag as a hex string.
pub fn sign(payload: &str, key: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let tag = hmac::sign(&key, payload.as_bytes());
    hex::encode(tag.as_ref())
}

/// Verifies a hex-encoded HMAC-SHA256 tag in constant time.
pub fn verify(payload: &str, signature: &str, key: &[u8]) -> bool {
    let Ok(tag) = hex::decode(signature) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::verify(&key, payload.as_bytes(), &tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_produces_hex() {
        let signature = sign("payload", b"test-signing-key");
        assert!(!signature.is_empty());
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_roundtrip_verifies() {
        let key = b"test-signing-key";
        let signature = sign("payload", key);
        assert!(verify("payload", &signature, key));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signature = sign("payload", b"key-one");
        assert!(!verify("payload", &signature, b"key-two"));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let key = b"test-signing-key";
        let signature = sign("payload", key);
        assert!(!verify("payload2", &signature, key));
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        assert!(!verify("payload", "not hex at all", b"key"));
    }
}
