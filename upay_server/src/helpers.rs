use std::{fmt::Display, str::FromStr};

use hmac::{Hmac, Mac};
use log::{debug, trace};
use md5::{Digest, Md5};
use sha2::Sha256;
use upg_common::Secret;

use crate::errors::ServerError;

type HmacSha256 = Hmac<Sha256>;

/// The name of the field that carries a signature. It is never part of the signed message.
pub const SIGNATURE_FIELD: &str = "signature";

/// How request and notification signatures are computed. Both schemes sign the same [`signing_string`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureScheme {
    /// `md5(signing_string + secret)` as lowercase hex. This is what the merchant plugins send and verify.
    #[default]
    Md5,
    /// HMAC-SHA256 of the signing string, keyed with the secret, as lowercase hex.
    HmacSha256,
}

impl FromStr for SignatureScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "hmac-sha256" | "hmac_sha256" => Ok(Self::HmacSha256),
            other => Err(format!("Unknown signature scheme '{other}'. Use md5 or hmac-sha256.")),
        }
    }
}

impl Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::HmacSha256 => write!(f, "hmac-sha256"),
        }
    }
}

/// Builds the message a signature covers: every `key=value` pair except the signature itself, sorted and joined with
/// `&`.
pub fn signing_string(params: &[(&str, String)]) -> String {
    let mut pairs = params
        .iter()
        .filter(|(k, _)| *k != SIGNATURE_FIELD)
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<String>>();
    pairs.sort();
    pairs.join("&")
}

/// Signs and verifies merchant messages with the shared API secret.
#[derive(Clone, Debug, Default)]
pub struct RequestSigner {
    scheme: SignatureScheme,
    secret: Secret<String>,
}

impl RequestSigner {
    pub fn new(scheme: SignatureScheme, secret: Secret<String>) -> Self {
        Self { scheme, secret }
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// Signs the parameters and returns the lowercase hex digest.
    pub fn sign(&self, params: &[(&str, String)]) -> Result<String, ServerError> {
        let digest = self.digest(&signing_string(params))?;
        Ok(hex::encode(digest))
    }

    /// Checks a merchant-supplied signature. Hex case is ignored. An empty secret never validates anything.
    pub fn verify(&self, params: &[(&str, String)], signature: &str) -> bool {
        if self.secret.is_empty() {
            debug!("💻️ No API secret is configured. Rejecting the signed request.");
            return false;
        }
        let Ok(supplied) = hex::decode(signature.trim()) else {
            trace!("💻️ Signature is not valid hex");
            return false;
        };
        let message = signing_string(params);
        match self.scheme {
            SignatureScheme::Md5 => md5_digest(&message, &self.secret) == supplied,
            SignatureScheme::HmacSha256 => {
                let Ok(mut mac) = new_mac(&self.secret) else {
                    return false;
                };
                mac.update(message.as_bytes());
                mac.verify_slice(&supplied).is_ok()
            },
        }
    }

    fn digest(&self, message: &str) -> Result<Vec<u8>, ServerError> {
        match self.scheme {
            SignatureScheme::Md5 => Ok(md5_digest(message, &self.secret)),
            SignatureScheme::HmacSha256 => {
                let mut mac = new_mac(&self.secret)?;
                mac.update(message.as_bytes());
                Ok(mac.finalize().into_bytes().to_vec())
            },
        }
    }
}

fn md5_digest(message: &str, secret: &Secret<String>) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(message.as_bytes());
    hasher.update(secret.reveal().as_bytes());
    hasher.finalize().to_vec()
}

fn new_mac(secret: &Secret<String>) -> Result<HmacSha256, ServerError> {
    HmacSha256::new_from_slice(secret.reveal().as_bytes())
        .map_err(|e| ServerError::ConfigurationError(format!("Unusable signing secret. {e}")))
}
