//! Compact signed session tokens.
//!
//! Wire format: three dot-separated base64url (unpadded) segments,
//! `header.claims.signature`. The signature is HMAC-SHA256 over
//! `header_b64.claims_b64` under the keyset's newest key, whose id rides in
//! the header so rotated-out keys keep verifying during their grace period.
//! Verification checks the signature before trusting any claim.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_VERSION: u8 = 1;

const ALG: &str = "HS256";
const TYP: &str = "JWT";
const MIN_KEY_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
    pub kid: String,
}

impl TokenHeader {
    fn hs256(kid: impl Into<String>) -> Self {
        Self {
            alg: ALG.to_string(),
            typ: TYP.to_string(),
            kid: kid.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signed payload. Immutable once minted; `jti` is present on refresh
/// tokens only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub v: u8,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("unknown key id: {0}")]
    UnknownKid(String),
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("empty keyset")]
    EmptyKeyset,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid token version")]
    InvalidVersion,
}

/// One signing key. Material is wrapped so it never lands in logs or
/// debug output.
pub struct SigningKey {
    kid: String,
    secret: SecretSlice<u8>,
}

impl SigningKey {
    /// # Errors
    ///
    /// Returns an error if the key material is shorter than 32 bytes.
    pub fn new(kid: impl Into<String>, secret: Vec<u8>) -> Result<Self, Error> {
        if secret.len() < MIN_KEY_BYTES {
            return Err(Error::InvalidKeyLength);
        }
        Ok(Self {
            kid: kid.into(),
            secret: SecretSlice::from(secret),
        })
    }

    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

/// Ordered signing keys, newest first. The head key mints; every listed key
/// verifies, which is what gives rotated-out keys their grace period.
pub struct SigningKeyset {
    keys: Vec<SigningKey>,
}

impl SigningKeyset {
    /// # Errors
    ///
    /// Returns an error if the keyset is empty.
    pub fn new(keys: Vec<SigningKey>) -> Result<Self, Error> {
        if keys.is_empty() {
            return Err(Error::EmptyKeyset);
        }
        Ok(Self { keys })
    }

    fn active(&self) -> Option<&SigningKey> {
        self.keys.first()
    }

    fn find_by_kid(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn mac_for(key: &SigningKey) -> Result<HmacSha256, Error> {
    HmacSha256::new_from_slice(key.secret.expose_secret()).map_err(|_| Error::InvalidKeyLength)
}

/// Mint a signed token under the keyset's active key.
///
/// # Errors
///
/// Returns an error if claims/header JSON cannot be encoded or the key
/// material is unusable.
pub fn mint(keyset: &SigningKeyset, claims: &Claims) -> Result<String, Error> {
    let key = keyset.active().ok_or(Error::EmptyKeyset)?;
    let header_b64 = b64e_json(&TokenHeader::hs256(key.kid()))?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = mac_for(key)?;
    mac.update(signing_input.as_bytes());
    let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify a token and return its decoded claims.
///
/// # Errors
///
/// Returns an error if:
/// - the token is malformed or contains invalid base64/json,
/// - the `kid` is unknown for the provided keyset,
/// - the signature is invalid,
/// - the claims fail validation (`v`, `exp` against `now_unix`).
pub fn verify(token: &str, keyset: &SigningKeyset, now_unix: i64) -> Result<Claims, Error> {
    let claims = verify_signed(token, keyset)?;
    if claims.exp <= now_unix {
        return Err(Error::Expired);
    }
    Ok(claims)
}

/// Verify a token's structure and signature without the expiry gate.
///
/// Logout accepts expired refresh tokens through this path; everything else
/// goes through [`verify`].
///
/// # Errors
///
/// Same as [`verify`], minus `Expired`.
pub fn verify_signed(token: &str, keyset: &SigningKeyset) -> Result<Claims, Error> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
    if parts.next().is_some() {
        return Err(Error::TokenFormat);
    }

    let header: TokenHeader = b64d_json(header_b64)?;
    if header.alg != ALG {
        return Err(Error::UnsupportedAlg(header.alg));
    }

    let key = keyset
        .find_by_kid(&header.kid)
        .ok_or_else(|| Error::UnknownKid(header.kid.clone()))?;

    let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
    let signing_input = format!("{header_b64}.{claims_b64}");
    let mut mac = mac_for(key)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| Error::InvalidSignature)?;

    // Signature holds; only now are the claims worth decoding.
    let claims: Claims = b64d_json(claims_b64)?;
    if claims.v != TOKEN_VERSION {
        return Err(Error::InvalidVersion);
    }
    Ok(claims)
}
