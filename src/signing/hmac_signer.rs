use crate::signing::{Signer, SigningRequest};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs lookup requests with HMAC-SHA256 over
/// `METHOD\nhost\npath\ncanonical-query`, base64 encoded
pub struct HmacSha256Signer {
    secret: Vec<u8>,
}

impl HmacSha256Signer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Builds the string the signature is computed over
    pub fn string_to_sign(request: &SigningRequest<'_>) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            request.method.to_ascii_uppercase(),
            request.host.to_ascii_lowercase(),
            request.path,
            request.canonical_query
        )
    }
}

impl std::fmt::Debug for HmacSha256Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Signer").finish_non_exhaustive()
    }
}

impl Signer for HmacSha256Signer {
    fn sign(&self, request: &SigningRequest<'_>) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA-256 accepts keys of any size");
        mac.update(Self::string_to_sign(request).as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> SigningRequest<'_> {
        SigningRequest {
            method: "GET",
            host: "webservices.amazon.com",
            path: "/onca/xml",
            canonical_query: query,
        }
    }

    #[test]
    fn test_string_to_sign_layout() {
        let s = HmacSha256Signer::string_to_sign(&request("A=1&B=2"));
        assert_eq!(s, "GET\nwebservices.amazon.com\n/onca/xml\nA=1&B=2");
    }

    #[test]
    fn test_signature_is_deterministic() {
        let signer = HmacSha256Signer::new("secret");
        let a = signer.sign(&request("A=1&B=2"));
        let b = signer.sign(&request("A=1&B=2"));
        assert_eq!(a, b);
        // 32-byte digest -> 44 base64 characters
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn test_signature_depends_on_query_order() {
        let signer = HmacSha256Signer::new("secret");
        let sorted = signer.sign(&request("A=1&B=2"));
        let unsorted = signer.sign(&request("B=2&A=1"));
        assert_ne!(sorted, unsorted);
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let a = HmacSha256Signer::new("secret-one").sign(&request("A=1"));
        let b = HmacSha256Signer::new("secret-two").sign(&request("A=1"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let signer = HmacSha256Signer::new("hunter2");
        assert!(!format!("{:?}", signer).contains("hunter2"));
    }
}
