use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const MIN_SECRET_LEN: usize = 32;
const SIGNING_ALGORITHM: &str = "HS256";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signing key is too short (min {MIN_SECRET_LEN} bytes)")]
    SecretTooShort,

    #[error("malformed token")]
    Malformed,

    #[error("unexpected signing method '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is expired")]
    Expired,

    #[error("token claims cannot be decoded")]
    ClaimsDecode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: SIGNING_ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Everything a verified token asserts about its bearer.
///
/// `role` is kept as issued; interpreting it is the caller's business so that
/// an unrecognised role can be rejected at the gate rather than at decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub role: String,
    pub user_agent: String,
    pub issued_at_ms: i64,
    pub expires_at_ms: i64,
}

impl TokenClaims {
    pub fn is_expired(&self, reference_ms: i64) -> bool {
        reference_ms >= self.expires_at_ms
    }
}

/// Signs and verifies bearer tokens with a single HMAC-SHA256 key.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Arc<[u8]>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::SecretTooShort);
        }

        Ok(Self {
            secret: Arc::<[u8]>::from(secret),
            ttl,
        })
    }

    /// Builds claims for one bearer, valid for the configured window from `issued_at_ms`.
    pub fn claims_for(
        &self,
        user_id: Uuid,
        role: &str,
        user_agent: &str,
        issued_at_ms: i64,
    ) -> TokenClaims {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        TokenClaims {
            user_id,
            role: role.to_string(),
            user_agent: user_agent.to_string(),
            issued_at_ms,
            expires_at_ms: issued_at_ms.saturating_add(ttl_ms),
        }
    }

    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let header = serde_json::to_vec(&TokenHeader::hs256()).map_err(|_| TokenError::ClaimsDecode)?;
        let payload = serde_json::to_vec(claims).map_err(|_| TokenError::ClaimsDecode)?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.mac(signing_input.as_bytes())?.finalize().into_bytes();
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    pub fn verify(&self, token: &str, reference_ms: i64) -> Result<TokenClaims, TokenError> {
        let mut segments = token.split('.');
        let (header_b64, payload_b64, signature_b64) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() => (h, p, s),
                _ => return Err(TokenError::Malformed),
            };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::ClaimsDecode)?;
        if header.alg != SIGNING_ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        // unsigned tokens ("header.claims.") never reach the MAC check
        if signature_b64.is_empty() {
            return Err(TokenError::Malformed);
        }
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        let signing_input_len = header_b64.len() + 1 + payload_b64.len();
        let mac = self.mac(token[..signing_input_len].as_bytes())?;
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::ClaimsDecode)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::ClaimsDecode)?;

        if claims.is_expired(reference_ms) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self, bytes: &[u8]) -> Result<HmacSha256, TokenError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::InvalidSignature)?;
        mac.update(bytes);
        Ok(mac)
    }
}
