use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Checks a `sha256=<hex>` header against the HMAC-SHA256 of the raw body.
pub fn verify_signature(app_secret: &str, signature_header: Option<&str>, body: &[u8]) -> bool {
    let signature = signature_header.unwrap_or("").trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature).trim();
    if signature.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Produces the header value the platform would send for `body`.
pub fn sign(app_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Compares a presented shared token with the configured one in constant
/// time. Both sides are digested first so the length is not leaked either.
pub fn tokens_match(expected: &str, presented: &str) -> bool {
    let digest = |value: &str| -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(TOKEN_DIGEST_KEY).ok()?;
        mac.update(value.as_bytes());
        Some(mac)
    };
    let (Some(expected), Some(presented)) = (digest(expected), digest(presented)) else {
        return false;
    };
    presented.verify_slice(&expected.finalize().into_bytes()).is_ok()
}

const TOKEN_DIGEST_KEY: &[u8] = b"intake-shared-token";
