//! Canonical parameter encoding and HMAC-SHA512 signing for gateway messages.
//!
//! Both the outbound redirect and the inbound callback are signed over the
//! same canonical string: every key and value form-urlencoded (space as `+`),
//! pairs sorted bytewise by encoded key, joined as `k=v&k=v`.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use url::form_urlencoded::byte_serialize;

type HmacSha512 = Hmac<Sha512>;

pub const SECURE_HASH: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

fn encode(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}

/// Encoded, sorted `(key, value)` pairs with the signature fields removed.
pub fn canonicalize(params: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| k.as_str() != SECURE_HASH && k.as_str() != SECURE_HASH_TYPE)
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    pairs
}

/// Joins canonical pairs without further encoding.
pub fn sign_data(pairs: &[(String, String)]) -> String {
    pairs.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

fn mac(secret: &str, data: &str) -> HmacSha512 {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    mac
}

/// Lowercase hex HMAC-SHA512 of `data`.
pub fn sign(secret: &str, data: &str) -> String {
    hex::encode(mac(secret, data).finalize().into_bytes())
}

/// Checks the `vnp_SecureHash` carried in `params` against the canonical form
/// of the remaining parameters. Hex case is ignored; comparison is constant time.
pub fn verify(secret: &str, params: &HashMap<String, String>) -> bool {
    let Some(provided) = params.get(SECURE_HASH) else {
        return false;
    };
    let Ok(provided) = hex::decode(provided.trim()) else {
        return false;
    };
    let data = sign_data(&canonicalize(params));
    mac(secret, &data).verify_slice(&provided).is_ok()
}
