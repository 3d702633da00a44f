//! Canonical CBOR encoding of a block header.
//!
//! The canonical form is the durable contract other implementations must
//! match bit-for-bit. It follows RFC 8949 Core Deterministic Encoding:
//! - Map keys are text, sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are fixed-layout text)
//!
//! Encoded map (schema version 1):
//!
//! ```text
//! { "seals":        [ { "type": text, "value": text }, ... ],
//!   "version":      1,
//!   "timestamp":    "YYYY-MM-DDTHH:MM:SS.nnnnnnnnnZ",
//!   "blockNumber":  uint,
//!   "previousLink": bytes(32) | null }
//! ```
//!
//! `previousLink` is always present; CBOR `null` is the only encoding of
//! "no predecessor". The fingerprint, signatures and signers never appear.

use chrono::{DateTime, SecondsFormat, Utc};
use ciborium::value::Value;

use crate::block::{BlockHeader, Seal};
use crate::error::CoreError;
use crate::types::Fingerprint;

/// Canonical schema version, encoded under the `version` key.
pub const CANONICAL_VERSION: u64 = 1;

/// Domain separation prefix for block fingerprints.
pub const FINGERPRINT_DOMAIN: &[u8] = b"microledger/block-fingerprint/v1";

/// Domain separation prefix for block signatures.
pub const SIGN_DOMAIN: &[u8] = b"microledger/block-signature/v1";

/// CBOR map key names.
mod keys {
    pub const VERSION: &str = "version";
    pub const BLOCK_NUMBER: &str = "blockNumber";
    pub const PREVIOUS_LINK: &str = "previousLink";
    pub const TIMESTAMP: &str = "timestamp";
    pub const SEALS: &str = "seals";
    pub const SEAL_TYPE: &str = "type";
    pub const SEAL_VALUE: &str = "value";
}

/// Encode a block header to canonical CBOR bytes.
pub fn canonicalize(header: &BlockHeader) -> Vec<u8> {
    let value = header_to_cbor_value(header);
    let mut buf = Vec::new();
    encode_value(&mut buf, &value);
    buf
}

/// Build the message a signature commits to (with domain separation).
pub fn sign_message(fingerprint: &Fingerprint) -> Vec<u8> {
    let mut msg = Vec::with_capacity(SIGN_DOMAIN.len() + 32);
    msg.extend_from_slice(SIGN_DOMAIN);
    msg.extend_from_slice(fingerprint.as_bytes());
    msg
}

/// Render a timestamp in the fixed canonical layout (UTC, nanoseconds, `Z`).
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn header_to_cbor_value(header: &BlockHeader) -> Value {
    let previous_link = match &header.previous_link {
        Some(link) => Value::Bytes(link.0.to_vec()),
        None => Value::Null,
    };

    let entries = vec![
        (
            Value::Text(keys::VERSION.to_string()),
            Value::Integer(CANONICAL_VERSION.into()),
        ),
        (
            Value::Text(keys::BLOCK_NUMBER.to_string()),
            Value::Integer(header.block_number.into()),
        ),
        (Value::Text(keys::PREVIOUS_LINK.to_string()), previous_link),
        (
            Value::Text(keys::TIMESTAMP.to_string()),
            Value::Text(canonical_timestamp(&header.timestamp)),
        ),
        (
            Value::Text(keys::SEALS.to_string()),
            Value::Array(header.seals.iter().map(seal_to_cbor_value).collect()),
        ),
    ];

    Value::Map(entries)
}

fn seal_to_cbor_value(seal: &Seal) -> Value {
    Value::Map(vec![
        (
            Value::Text(keys::SEAL_TYPE.to_string()),
            Value::Text(seal.seal_type.clone()),
        ),
        (
            Value::Text(keys::SEAL_VALUE.to_string()),
            Value::Text(seal.seal_value.clone()),
        ),
    ])
}

/// Recursively encode a CBOR value.
fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        other => unreachable!("canonical block form never contains {:?}", other),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value(buf, item);
    }
}

/// Encode a map with keys sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, value);
    }
}

/// Decode canonical bytes back into a block header.
///
/// Rejects input that parses but is not in canonical form, so a header
/// recovered here always re-encodes to the same bytes.
pub fn decode_header(bytes: &[u8]) -> Result<BlockHeader, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))?;

    let map = match &value {
        Value::Map(m) => m,
        _ => return Err(CoreError::Decoding("expected map".into())),
    };

    let get = |key: &str| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
            .map(|(_, v)| v)
    };

    match get(keys::VERSION) {
        Some(Value::Integer(i)) if u64::try_from(*i).ok() == Some(CANONICAL_VERSION) => {}
        _ => return Err(CoreError::Decoding("unsupported canonical version".into())),
    }

    let block_number = match get(keys::BLOCK_NUMBER) {
        Some(Value::Integer(i)) => u64::try_from(*i)
            .map_err(|_| CoreError::Decoding("blockNumber out of range".into()))?,
        _ => return Err(CoreError::Decoding("missing blockNumber".into())),
    };

    let previous_link = match get(keys::PREVIOUS_LINK) {
        Some(Value::Null) => None,
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            Some(Fingerprint(arr))
        }
        _ => return Err(CoreError::Decoding("invalid previousLink".into())),
    };

    let timestamp = match get(keys::TIMESTAMP) {
        Some(Value::Text(s)) => DateTime::parse_from_rfc3339(s)
            .map_err(|e| CoreError::Decoding(format!("invalid timestamp: {}", e)))?
            .with_timezone(&Utc),
        _ => return Err(CoreError::Decoding("missing timestamp".into())),
    };

    let seals = match get(keys::SEALS) {
        Some(Value::Array(items)) => {
            let mut seals = Vec::with_capacity(items.len());
            for item in items {
                seals.push(cbor_value_to_seal(item)?);
            }
            seals
        }
        _ => return Err(CoreError::Decoding("missing seals".into())),
    };

    let header = BlockHeader {
        block_number,
        previous_link,
        timestamp,
        seals,
    };

    if canonicalize(&header) != bytes {
        return Err(CoreError::Decoding("input is not in canonical form".into()));
    }

    Ok(header)
}

fn cbor_value_to_seal(value: &Value) -> Result<Seal, CoreError> {
    let entries = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::Decoding("seal must be a map".into())),
    };
    let text = |key: &str| -> Result<String, CoreError> {
        entries
            .iter()
            .find_map(|(k, v)| match (k, v) {
                (Value::Text(k), Value::Text(v)) if k == key => Some(v.clone()),
                _ => None,
            })
            .ok_or_else(|| CoreError::Decoding(format!("seal missing {}", key)))
    };
    Ok(Seal {
        seal_type: text(keys::SEAL_TYPE)?,
        seal_value: text(keys::SEAL_VALUE)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn genesis_header() -> BlockHeader {
        BlockHeader {
            block_number: 1,
            previous_link: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            seals: Vec::new(),
        }
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let header = genesis_header();
        assert_eq!(canonicalize(&header), canonicalize(&header.clone()));
    }

    #[test]
    fn test_timestamp_fixed_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(canonical_timestamp(&ts), "2024-01-01T00:00:00.000000000Z");

        let ts = Utc.timestamp_opt(1_700_000_000, 120).unwrap();
        assert_eq!(canonical_timestamp(&ts), "2023-11-14T22:13:20.000000120Z");
    }

    #[test]
    fn test_absent_link_is_null_not_empty() {
        let header = genesis_header();
        let bytes = canonicalize(&header);
        // "previousLink" key (0x6c + 12 bytes) followed by CBOR null
        let key = b"previousLink";
        let pos = bytes
            .windows(key.len())
            .position(|w| w == key)
            .expect("previousLink key present");
        assert_eq!(bytes[pos - 1], 0x6c);
        assert_eq!(bytes[pos + key.len()], 0xf6);
    }

    #[test]
    fn test_link_changes_bytes() {
        let genesis = genesis_header();
        let mut linked = genesis.clone();
        linked.previous_link = Some(Fingerprint::from_bytes([0; 32]));
        assert_ne!(canonicalize(&genesis), canonicalize(&linked));
    }

    #[test]
    fn test_seals_are_ordered() {
        let mut a = genesis_header();
        a.seals = vec![Seal::new("SHA-256", "aa"), Seal::new("SHA-256", "bb")];
        let mut b = genesis_header();
        b.seals = vec![Seal::new("SHA-256", "bb"), Seal::new("SHA-256", "aa")];
        assert_ne!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn test_map_key_ordering() {
        let bytes = canonicalize(&genesis_header());
        // Map header (5 entries), then the shortest key: "seals"
        assert_eq!(bytes[0], 0xa5);
        assert_eq!(bytes[1], 0x65);
        assert_eq!(&bytes[2..7], b"seals");
        assert_eq!(bytes[7], 0x80); // empty array
        assert_eq!(bytes[8], 0x67);
        assert_eq!(&bytes[9..16], b"version");
        assert_eq!(bytes[16], 0x01);
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 0x1_0000_0000);
        assert_eq!(buf, vec![0x1b, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_header() {
        let mut header = genesis_header();
        header.block_number = 300;
        header.previous_link = Some(Fingerprint::from_bytes([0x5a; 32]));
        header.seals = vec![Seal::new("SHA-256", "abcd1234")];

        let decoded = decode_header(&canonicalize(&header)).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        let mut bytes = canonicalize(&genesis_header());
        bytes.push(0x00);
        assert!(decode_header(&bytes).is_err());
        assert!(decode_header(&[0xf6]).is_err());
    }

    #[test]
    fn test_sign_message_layout() {
        let fp = Fingerprint::from_bytes([0x07; 32]);
        let msg = sign_message(&fp);
        assert!(msg.starts_with(SIGN_DOMAIN));
        assert_eq!(&msg[SIGN_DOMAIN.len()..], fp.as_bytes());
    }
}
