//! Webhook signature verification for the two provider schemes NexusHub
//! receives: Mux (`mux-signature: t=<ts>,v1=<hex>`) and Clerk, which signs
//! through Svix using the Standard Webhooks scheme.
//!
//! Every function here returns a plain verdict and never panics. Callers map a
//! `false` onto the HTTP status their route promises.

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Svix rejects deliveries whose timestamp is further than this from now.
pub const SVIX_TOLERANCE_SECS: i64 = 5 * 60;

const SVIX_SECRET_PREFIX: &str = "whsec_";

/// Parsed `mux-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxSignatureHeader {
    pub timestamp: String,
    pub signatures: Vec<Vec<u8>>,
}

/// Split a `mux-signature` header into its timestamp and `v1` signatures.
///
/// Returns `None` when there is no timestamp, no `v1` entry, or a `v1` entry
/// is not valid hex.
pub fn parse_mux_signature_header(header: &str) -> Option<MuxSignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part.trim().split_once('=')?;
        match key {
            "t" | "timestamp" => timestamp = Some(value.to_string()),
            "v1" => signatures.push(hex::decode(value).ok()?),
            _ => {}
        }
    }

    let timestamp = timestamp.filter(|t| !t.is_empty())?;
    if signatures.is_empty() {
        return None;
    }
    Some(MuxSignatureHeader {
        timestamp,
        signatures,
    })
}

fn mux_mac(secret: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(mac)
}

/// Hex HMAC-SHA256 of `"{timestamp}.{body}"`, the `v1` value Mux sends.
pub fn compute_mux_signature(secret: &str, timestamp: &str, body: &[u8]) -> String {
    match mux_mac(secret, timestamp, body) {
        Some(mac) => hex::encode(mac.finalize().into_bytes()),
        None => String::new(),
    }
}

/// Verify a Mux webhook against the shared secret.
///
/// An empty secret never verifies: the route treats a missing secret as a
/// configuration error and must not accept anything in that state.
pub fn verify_mux_signature(secret: &str, body: &[u8], signature_header: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let header = match parse_mux_signature_header(signature_header) {
        Some(h) => h,
        None => return false,
    };
    let mac = match mux_mac(secret, &header.timestamp, body) {
        Some(m) => m,
        None => return false,
    };

    header
        .signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok())
}

/// Decode a Svix signing secret. Secrets are `whsec_<base64>`; anything that
/// does not decode is used as raw bytes.
fn svix_secret_bytes(secret: &str) -> Vec<u8> {
    let encoded = secret.strip_prefix(SVIX_SECRET_PREFIX).unwrap_or(secret);
    match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(b) => b,
        Err(_) => secret.as_bytes().to_vec(),
    }
}

fn svix_mac(secret: &str, msg_id: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(&svix_secret_bytes(secret)).ok()?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(mac)
}

/// Build the `svix-signature` header value for a payload: `v1,<base64>`.
pub fn compute_svix_signature(secret: &str, msg_id: &str, timestamp: &str, body: &[u8]) -> String {
    match svix_mac(secret, msg_id, timestamp, body) {
        Some(mac) => {
            let digest = mac.finalize().into_bytes();
            format!(
                "v1,{}",
                base64::engine::general_purpose::STANDARD.encode(digest)
            )
        }
        None => String::new(),
    }
}

/// Verify a Svix-signed delivery.
///
/// Signed content is `"{svix-id}.{svix-timestamp}.{body}"`. The header may
/// carry several space-separated `v1,<base64>` signatures (secret rotation);
/// any match accepts. The timestamp must be within [`SVIX_TOLERANCE_SECS`] of
/// `now_secs`.
pub fn verify_svix_signature(
    secret: &str,
    body: &[u8],
    msg_id: &str,
    timestamp: &str,
    signature_header: &str,
    now_secs: i64,
) -> bool {
    if secret.is_empty() || msg_id.is_empty() {
        return false;
    }
    let sent_at: i64 = match timestamp.trim().parse() {
        Ok(t) => t,
        Err(_) => return false,
    };
    if now_secs.abs_diff(sent_at) > SVIX_TOLERANCE_SECS.unsigned_abs() {
        return false;
    }

    let mac = match svix_mac(secret, msg_id, timestamp, body) {
        Some(m) => m,
        None => return false,
    };

    signature_header.split_whitespace().any(|entry| {
        let encoded = match entry.split_once(',') {
            Some(("v1", sig)) => sig,
            _ => return false,
        };
        match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(sig) => mac.clone().verify_slice(&sig).is_ok(),
            Err(_) => false,
        }
    })
}
