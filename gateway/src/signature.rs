//! EC2 Signature Version 2 verification.
//!
//! The caller signs
//!
//! ```text
//! METHOD \n host \n path \n canonical-query-string
//! ```
//!
//! with HMAC-SHA256 (or HMAC-SHA1) keyed by its secret key and sends the
//! base64 encoded digest as the `Signature` parameter. The canonical query
//! string is every other parameter, sorted by name and percent-encoded with
//! the RFC 3986 unreserved set.

use crate::credentials::{Credential, CredentialStore};
use crate::errors::{GatewayError, Result};
use crate::params::{Params, RequestContext};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use sha2::Sha256;
use std::str::FromStr;
use std::sync::Arc;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

pub const ACCESS_KEY_PARAM: &str = "AWSAccessKeyId";
const ACCESS_KEY_ALIAS: &str = "AccessKeyId";
pub const SIGNATURE_PARAM: &str = "Signature";
pub const SIGNATURE_VERSION_PARAM: &str = "SignatureVersion";
pub const SIGNATURE_METHOD_PARAM: &str = "SignatureMethod";

const SUPPORTED_SIGNATURE_VERSION: &str = "2";

/// Everything except the RFC 3986 unreserved characters gets encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureMethod {
    HmacSha1,
    HmacSha256,
}

impl SignatureMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HmacSHA1",
            SignatureMethod::HmacSha256 => "HmacSHA256",
        }
    }

    fn digest(&self, secret: &str, data: &[u8]) -> Vec<u8> {
        match self {
            SignatureMethod::HmacSha1 => {
                let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
                    .expect("HMAC can take key of any size");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            SignatureMethod::HmacSha256 => {
                let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                    .expect("HMAC can take key of any size");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Constant-time comparison of `expected` against the MAC of `data`.
    fn verify(&self, secret: &str, data: &[u8], expected: &[u8]) -> bool {
        match self {
            SignatureMethod::HmacSha1 => {
                let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
                    .expect("HMAC can take key of any size");
                mac.update(data);
                mac.verify_slice(expected).is_ok()
            }
            SignatureMethod::HmacSha256 => {
                let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                    .expect("HMAC can take key of any size");
                mac.update(data);
                mac.verify_slice(expected).is_ok()
            }
        }
    }
}

impl FromStr for SignatureMethod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HmacSHA1" => Ok(SignatureMethod::HmacSha1),
            "HmacSHA256" => Ok(SignatureMethod::HmacSha256),
            other => Err(GatewayError::InvalidParameterValue(format!(
                "Value ({other}) for parameter {SIGNATURE_METHOD_PARAM} is invalid. \
                 Expected HmacSHA1 or HmacSHA256."
            ))),
        }
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// All parameters except `Signature`, sorted by name.
pub fn canonical_query_string(params: &Params) -> String {
    params
        .iter()
        .filter(|(name, _)| *name != SIGNATURE_PARAM)
        .map(|(name, value)| format!("{}={}", encode(name), encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn string_to_sign(method: &str, host: &str, path: &str, params: &Params) -> String {
    let path = if path.is_empty() { "/" } else { path };
    format!(
        "{}\n{}\n{}\n{}",
        method.to_uppercase(),
        host.to_lowercase(),
        path,
        canonical_query_string(params)
    )
}

/// Computes the base64 signature a client holding `secret` would send.
pub fn compute_signature(
    secret: &str,
    signature_method: SignatureMethod,
    method: &str,
    host: &str,
    path: &str,
    params: &Params,
) -> String {
    let data = string_to_sign(method, host, path, params);
    STANDARD.encode(signature_method.digest(secret, data.as_bytes()))
}

/// Query string a client sends: the canonical parameters followed by the
/// encoded `signature`.
pub fn signed_query_string(params: &Params, signature: &str) -> String {
    format!(
        "{}&{SIGNATURE_PARAM}={}",
        canonical_query_string(params),
        encode(signature)
    )
}

/// Checks the signature of `ctx` against `credential`.
pub fn verify_signature(ctx: &RequestContext, credential: &Credential) -> Result<()> {
    let params = ctx.params();
    let supplied = params.get(SIGNATURE_PARAM)?;
    let signature_method: SignatureMethod = params.get(SIGNATURE_METHOD_PARAM)?.parse()?;

    let supplied = STANDARD
        .decode(supplied.as_bytes())
        .map_err(|_| signature_mismatch())?;

    let data = string_to_sign(ctx.method().as_str(), ctx.host(), ctx.path(), params);
    if signature_method.verify(&credential.secret_key, data.as_bytes(), &supplied) {
        Ok(())
    } else {
        Err(signature_mismatch())
    }
}

fn signature_mismatch() -> GatewayError {
    GatewayError::AuthFailure(
        "The request signature we calculated does not match the signature you provided. \
         Check your key and signing method."
            .to_string(),
    )
}

/// Authentication middleware run by the dispatcher before every handler.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Authenticator { store }
    }

    /// Resolves the caller's credential and verifies the request signature.
    ///
    /// Parameter problems are reported before the credential lookup, so a
    /// request without `Signature` fails with `MissingParameter` even when
    /// its access key is unknown.
    pub fn authenticate(&self, ctx: &RequestContext) -> Result<Credential> {
        let params = ctx.params();

        let access_key = params
            .get(ACCESS_KEY_PARAM)
            .or_else(|_| params.get(ACCESS_KEY_ALIAS))
            .map_err(|_| GatewayError::MissingParameter(ACCESS_KEY_PARAM.to_string()))?;

        params.require_parameters(&[
            SIGNATURE_PARAM,
            SIGNATURE_VERSION_PARAM,
            SIGNATURE_METHOD_PARAM,
        ])?;

        let version = params.get(SIGNATURE_VERSION_PARAM)?;
        if version != SUPPORTED_SIGNATURE_VERSION {
            return Err(GatewayError::InvalidParameterValue(format!(
                "Value ({version}) for parameter {SIGNATURE_VERSION_PARAM} is invalid. \
                 Only version {SUPPORTED_SIGNATURE_VERSION} is supported."
            )));
        }
        params.get(SIGNATURE_METHOD_PARAM)?.parse::<SignatureMethod>()?;

        let credential = self.store.lookup(access_key).ok_or_else(|| {
            GatewayError::AuthFailure(
                "AWS was not able to validate the provided access credentials".to_string(),
            )
        })?;

        verify_signature(ctx, &credential)?;

        tracing::debug!(access_key = %credential.access_key, "Request authenticated");
        Ok(credential)
    }
}
