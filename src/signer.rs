//! Signer — verifies that a request URL + query was signed by a trusted
//! peer. HMAC-SHA256 over the canonicalized path-plus-sorted-query string
//! (excluding the signature parameter itself), constant-time compared.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("invalid key length")]
    InvalidKeyLength,
}

#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Canonicalize `path` plus every query parameter except `hmac`,
    /// sorted by key, as `key=value&key=value...`.
    pub fn canonical_form(path: &str, query_pairs: &[(String, String)]) -> String {
        let mut pairs: Vec<&(String, String)> =
            query_pairs.iter().filter(|(k, _)| k != "hmac").collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }

    /// Sign the canonical form, returning a lowercase hex digest.
    pub fn sign(&self, canonical: &str) -> Result<String, SignerError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| SignerError::InvalidKeyLength)?;
        mac.update(canonical.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify `signature` (lowercase hex) against the canonical form.
    /// Returns `Ok(false)` for a mismatch, `Err` only for a configuration
    /// error (bad key length) — matching spec.md §4.4's `(valid, error)`
    /// split where only `error` surfaces as 500.
    pub fn verify(&self, canonical: &str, signature: &str) -> Result<bool, SignerError> {
        let expected = self.sign(canonical)?;
        let expected_bytes = expected.as_bytes();
        let actual_bytes = signature.as_bytes();

        if expected_bytes.len() != actual_bytes.len() {
            return Ok(false);
        }
        Ok(bool::from(expected_bytes.ct_eq(actual_bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let signer = Signer::new(b"secret".to_vec());
        let canonical = Signer::canonical_form(
            "/id/123/100/100.jpg",
            &[("grayscale".into(), "".into())],
        );
        let sig = signer.sign(&canonical).unwrap();
        assert!(signer.verify(&canonical, &sig).unwrap());
    }

    #[test]
    fn tamper_is_rejected() {
        let signer = Signer::new(b"secret".to_vec());
        let canonical = Signer::canonical_form("/id/123/100/100.jpg", &[]);
        let mut sig = signer.sign(&canonical).unwrap();
        // Flip one hex character.
        let last = sig.pop().unwrap();
        let flipped = if last == '0' { '1' } else { '0' };
        sig.push(flipped);
        assert!(!signer.verify(&canonical, &sig).unwrap());
    }

    #[test]
    fn signature_param_excluded_from_canonical_form() {
        let with_sig = Signer::canonical_form(
            "/id/123/100/100.jpg",
            &[
                ("hmac".into(), "whatever".into()),
                ("grayscale".into(), "".into()),
            ],
        );
        let without_sig =
            Signer::canonical_form("/id/123/100/100.jpg", &[("grayscale".into(), "".into())]);
        assert_eq!(with_sig, without_sig);
    }

    #[test]
    fn query_params_are_sorted() {
        let a = Signer::canonical_form(
            "/p",
            &[("b".into(), "2".into()), ("a".into(), "1".into())],
        );
        let b = Signer::canonical_form(
            "/p",
            &[("a".into(), "1".into()), ("b".into(), "2".into())],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn different_keys_produce_different_signatures() {
        let canonical = "/id/1/1/1.jpg";
        let s1 = Signer::new(b"secret-a".to_vec()).sign(canonical).unwrap();
        let s2 = Signer::new(b"secret-b".to_vec()).sign(canonical).unwrap();
        assert_ne!(s1, s2);
    }
}
