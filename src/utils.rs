use tracing::error;
use uuid::Uuid;

// For signature verification
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";
const SUFFIX_LEN: usize = 7;

/// Helper function for verifying GitHub webhook signature
pub fn verify_github_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    // Expected format: "sha256=..."
    let Some(git_signature) = signature_header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    // GitHub provides the signature as hex
    match hex_decode(git_signature) {
        // Constant-time comparison
        Ok(git_signature_bytes) => mac.verify_slice(&git_signature_bytes).is_ok(),
        Err(_) => {
            error!("Signature header is not valid hex");
            false
        }
    }
}

/// Hex signature header value for `payload`, as GitHub would send it.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Seven random hex characters, used to keep audit keys unique.
pub fn random_suffix() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SUFFIX_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"zen":"Design for failure."}"#;

    #[test]
    fn accepts_matching_signature() {
        let header = sign_payload("s3cret", BODY).unwrap();
        assert!(verify_github_signature("s3cret", BODY, &header));
    }

    #[test]
    fn rejects_wrong_secret_or_body() {
        let header = sign_payload("s3cret", BODY).unwrap();
        assert!(!verify_github_signature("other", BODY, &header));
        assert!(!verify_github_signature("s3cret", b"{}", &header));
    }

    #[test]
    fn rejects_malformed_headers() {
        let header = sign_payload("s3cret", BODY).unwrap();
        let sha1_style = header.replacen("sha256=", "sha1=", 1);
        assert!(!verify_github_signature("s3cret", BODY, &sha1_style));
        assert!(!verify_github_signature("s3cret", BODY, "sha256=not-hex"));
        assert!(!verify_github_signature("s3cret", BODY, ""));
    }

    #[test]
    fn suffix_is_seven_hex_chars() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 7);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(random_suffix(), random_suffix());
    }
}
