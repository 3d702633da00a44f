//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding, fingerprint and Ed25519
//! signature so that every implementation produces identical results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use microledger_core::{
    canonicalize, validate, Block, BlockBuilder, ChainVerdict, Fingerprint, Seal,
    SignerIdentity, SigningKeypair,
};

/// Seed of the Ed25519 key that signs every golden block.
pub const GOLDEN_SEED: [u8; 32] = [0x42; 32];

/// SPKI PEM of the golden key.
pub const GOLDEN_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----\n\
MCowBQYDK2VwAyEAIVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=\n\
-----END PUBLIC KEY-----\n";

/// A golden test vector.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub block_number: u64,
    /// Index of the vector this one links to, if any.
    pub links_to: Option<usize>,
    /// Canonical timestamp text.
    pub timestamp: &'static str,
    /// Data sealed with a SHA-256 seal, if any.
    pub sealed_data: Option<&'static [u8]>,
    /// Expected canonical bytes (hex).
    pub expected_canonical: &'static str,
    /// Expected fingerprint (hex).
    pub expected_fingerprint: &'static str,
    /// Expected Ed25519 signature over the fingerprint (hex).
    pub expected_signature: &'static str,
}

/// Get all golden test vectors, in chain order.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "genesis without seals",
            block_number: 1,
            links_to: None,
            timestamp: "2024-01-01T00:00:00.000000000Z",
            sealed_data: None,
            expected_canonical: "a5657365616c73806776657273696f6e016974696d657374616d70781e\
                                 323032342d30312d30315430303a30303a30302e3030303030303030305a\
                                 6b626c6f636b4e756d626572016c70726576696f75734c696e6bf6",
            expected_fingerprint: "de09d59b962e39dd84add51524f5c4c164cf7b32a5bf258b0417b135da3ed12c",
            expected_signature: "00d5683ff1cfad0527e4896a09614319937a49f844f88ef5a1337549dc70253e\
                                 663f916b7c910370a3a031d5e5466e3fe8852f68ac44f7c20924cd7c31920905",
        },
        GoldenVector {
            name: "second block with one seal",
            block_number: 2,
            links_to: Some(0),
            timestamp: "2024-01-01T00:00:01.000000000Z",
            sealed_data: Some(b"block 2"),
            expected_canonical: "a5657365616c7381a26474797065675348412d3235366576616c7565784033\
                                 6332303031616163636561623230316339356261666637396264313064613833\
                                 616466326565323762663834363737376338623738646535656564366561356776\
                                 657273696f6e016974696d657374616d70781e323032342d30312d3031543030\
                                 3a30303a30312e3030303030303030305a6b626c6f636b4e756d626572026c70\
                                 726576696f75734c696e6b5820de09d59b962e39dd84add51524f5c4c164cf7b\
                                 32a5bf258b0417b135da3ed12c",
            expected_fingerprint: "528a28dc82c29a3d161ea12d1c4f95275be83686c2efe6d61283576e1664eb4d",
            expected_signature: "7a9dd64eaf5cae7acb4bdf6ba0717817d16f2e324615ff427d1ea27053ac4c71\
                                 6ffc0c6cf8c8534214944a14c48676083e971044d55326f1247e517abf5fa003",
        },
    ]
}

/// Parse a vector's canonical timestamp.
pub fn vector_timestamp(vector: &GoldenVector) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(vector.timestamp)
        .expect("golden timestamps are valid RFC 3339")
        .with_timezone(&Utc)
}

/// Identity the golden blocks are signed under.
pub fn golden_identity() -> SignerIdentity {
    SignerIdentity::new("Custodian", "golden")
}

/// Build the golden chain, one block per vector.
pub fn generate_golden_chain() -> Vec<Block> {
    let keypair = SigningKeypair::ed25519_from_seed(&GOLDEN_SEED);
    let mut blocks: Vec<Block> = Vec::new();

    for vector in all_vectors() {
        let tip = vector.links_to.and_then(|i| blocks.get(i)).map(Block::tip);
        let mut builder = BlockBuilder::from_tip(tip.as_ref()).timestamp(vector_timestamp(&vector));
        if let Some(data) = vector.sealed_data {
            builder = builder.seal(Seal::sha256(data));
        }
        match builder.sign(&keypair, &golden_identity()) {
            Ok(block) => blocks.push(block),
            Err(_) => break,
        }
    }

    blocks
}

/// Check every golden vector against this implementation.
///
/// Returns `(name, matches, computed fingerprint hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let blocks = generate_golden_chain();
    let chain_valid = validate(&blocks) == ChainVerdict::Valid;

    all_vectors()
        .iter()
        .zip(blocks.iter())
        .map(|(v, block)| {
            let canonical = hex::encode(canonicalize(&block.header));
            let fingerprint = block.fingerprint.to_hex();
            let matches = chain_valid
                && block.block_number() == v.block_number
                && canonical == v.expected_canonical
                && fingerprint == v.expected_fingerprint
                && block.signatures[0].value == v.expected_signature
                && block.signers[0].public_key == GOLDEN_PUBLIC_KEY_PEM
                && Fingerprint::compute(&canonicalize(&block.header)) == block.fingerprint;
            (v.name.to_string(), matches, fingerprint)
        })
        .collect()
}

/// Export the golden vectors as pretty-printed JSON, for other implementations.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_match() {
        let results = verify_all_vectors();
        assert_eq!(results.len(), all_vectors().len());
        for (name, matches, fingerprint) in results {
            assert!(matches, "golden vector '{}' mismatch (got {})", name, fingerprint);
        }
    }

    #[test]
    fn test_vectors_json_export() {
        let json = vectors_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &parsed[0];
        assert_eq!(first["block_number"], 1);
        assert!(first["links_to"].is_null());
        assert_eq!(
            first["expected_fingerprint"],
            "de09d59b962e39dd84add51524f5c4c164cf7b32a5bf258b0417b135da3ed12c"
        );
        assert_eq!(parsed[1]["links_to"], 0);
    }

    #[test]
    fn test_golden_chain_is_deterministic() {
        assert_eq!(generate_golden_chain(), generate_golden_chain());
    }

    #[test]
    fn test_golden_link_flip_breaks_chain() {
        let mut blocks = generate_golden_chain();
        let mut link = blocks[1].header.previous_link.unwrap().0;
        link[0] ^= 0x10; // flips one hex character
        blocks[1].header.previous_link = Some(Fingerprint(link));
        assert_eq!(validate(&blocks).invalid_at(), Some((1, "broken chain link")));
    }
}
