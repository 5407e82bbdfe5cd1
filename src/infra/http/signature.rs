//! Ed25519 verification of inbound interaction requests.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use ed25519_dalek::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, Signature, VerifyingKey};
use http_body_util::LengthLimitError;
use thiserror::Error;

use crate::application::error::HttpError;

use super::AppState;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

const SOURCE: &str = "infra::http::signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("public key is not 32 hex-encoded bytes")]
    InvalidKey,
    #[error("signature is not 64 hex-encoded bytes")]
    Malformed,
    #[error("signature does not match request")]
    Mismatch,
}

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    pub fn from_hex(public_key: &str) -> Result<Self, SignatureError> {
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        hex::decode_to_slice(public_key.trim(), &mut bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::new(key))
    }

    /// Check `signature` against `timestamp || body`.
    pub fn verify(
        &self,
        timestamp: &str,
        body: &[u8],
        signature: &str,
    ) -> Result<(), SignatureError> {
        let mut raw = [0u8; SIGNATURE_LENGTH];
        hex::decode_to_slice(signature.trim(), &mut raw)
            .map_err(|_| SignatureError::Malformed)?;
        let signature = Signature::from_bytes(&raw);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify_strict(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }

    pub fn verify_headers(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureError> {
        let signature = header(headers, SIGNATURE_HEADER)?;
        let timestamp = header(headers, TIMESTAMP_HEADER)?;
        self.verify(timestamp, body, signature)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(SignatureError::MissingHeader(name))
}

/// Buffer the body, verify it, and hand the request on unchanged.
pub async fn verify_signature(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes: Bytes = match axum::body::to_bytes(body, state.body_limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let inner = err.into_inner();
            if inner.downcast_ref::<LengthLimitError>().is_some() {
                return HttpError::new(
                    SOURCE,
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Request body too large",
                    inner.to_string(),
                )
                .into_response();
            }
            return HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Unreadable request body",
                inner.to_string(),
            )
            .into_response();
        }
    };

    if let Err(err) = state.verifier.verify_headers(&parts.headers, &bytes) {
        return HttpError::new(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "invalid request signature",
            err.to_string(),
        )
        .into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    const TIMESTAMP: &str = "1700000000";
    const BODY: &[u8] = br#"{"type":1}"#;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn sign(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(key.sign(&message).to_bytes())
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::from_hex(&hex::encode(signing_key().verifying_key().to_bytes()))
            .expect("valid key")
    }

    #[test]
    fn accepts_matching_signature() {
        let signature = sign(&signing_key(), TIMESTAMP, BODY);
        assert_eq!(verifier().verify(TIMESTAMP, BODY, &signature), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = sign(&signing_key(), TIMESTAMP, BODY);
        assert_eq!(
            verifier().verify(TIMESTAMP, br#"{"type":2}"#, &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_shifted_timestamp() {
        let signature = sign(&signing_key(), TIMESTAMP, BODY);
        assert_eq!(
            verifier().verify("1700000001", BODY, &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_foreign_key() {
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let signature = sign(&other, TIMESTAMP, BODY);
        assert_eq!(
            verifier().verify(TIMESTAMP, BODY, &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert_eq!(
            verifier().verify(TIMESTAMP, BODY, "zz"),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn missing_headers_are_reported() {
        let headers = HeaderMap::new();
        assert_eq!(
            verifier().verify_headers(&headers, BODY),
            Err(SignatureError::MissingHeader(SIGNATURE_HEADER))
        );
    }

    #[test]
    fn malformed_public_key_is_rejected() {
        assert_eq!(
            SignatureVerifier::from_hex("abcd").map(|_| ()),
            Err(SignatureError::InvalidKey)
        );
    }
}
