//! Proptest generators for property-based testing.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use microledger_core::{
    Block, BlockBuilder, Fingerprint, Seal, SignatureAlgorithm, SignerIdentity, SigningKeypair,
};

/// Generate a random Ed25519 keypair.
pub fn keypair() -> impl Strategy<Value = SigningKeypair> {
    any::<[u8; 32]>().prop_map(|seed| SigningKeypair::ed25519_from_seed(&seed))
}

/// Generate a keypair of either supported algorithm.
///
/// secp256k1 seeds outside the scalar range fall back to Ed25519.
pub fn any_keypair() -> impl Strategy<Value = SigningKeypair> {
    (any::<[u8; 32]>(), any::<bool>()).prop_map(|(seed, secp)| {
        if secp {
            SigningKeypair::from_seed(SignatureAlgorithm::Es256k, &seed)
                .unwrap_or_else(|_| SigningKeypair::ed25519_from_seed(&seed))
        } else {
            SigningKeypair::ed25519_from_seed(&seed)
        }
    })
}

/// Generate a random Fingerprint.
pub fn fingerprint() -> impl Strategy<Value = Fingerprint> {
    any::<[u8; 32]>().prop_map(Fingerprint::from_bytes)
}

/// Generate a timestamp between 1970 and roughly 2100, with nanoseconds.
pub fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..=4_102_444_800i64, 0u32..1_000_000_000u32)
        .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
}

/// Generate a seal with arbitrary (possibly non-ASCII) text.
pub fn seal() -> impl Strategy<Value = Seal> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..64).prop_map(|data| Seal::sha256(&data)),
        ("[A-Za-z0-9-]{1,16}", ".{0,48}").prop_map(|(t, v)| Seal::new(t, v)),
    ]
}

/// Generate a list of seals.
pub fn seals(max_len: usize) -> impl Strategy<Value = Vec<Seal>> {
    prop::collection::vec(seal(), 0..=max_len)
}

/// Parameters for generating a block.
#[derive(Debug, Clone)]
pub struct BlockParams {
    pub keypair: SigningKeypair,
    pub block_number: u64,
    pub previous_link: Option<Fingerprint>,
    pub timestamp: DateTime<Utc>,
    pub seals: Vec<Seal>,
}

impl Arbitrary for BlockParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any_keypair(),
            1u64..=1_000_000u64, // block number
            fingerprint(),
            timestamp(),
            seals(4),
        )
            .prop_map(|(keypair, block_number, link, timestamp, seals)| BlockParams {
                keypair,
                block_number,
                previous_link: (block_number > 1).then_some(link),
                timestamp,
                seals,
            })
            .boxed()
    }
}

/// Generate a signed block from parameters.
pub fn block_from_params(params: &BlockParams) -> Block {
    BlockBuilder::with_position(params.block_number, params.previous_link)
        .timestamp(params.timestamp)
        .seals(params.seals.clone())
        .sign(&params.keypair, &SignerIdentity::new("Custodian", "proptest"))
        .expect("generated positions are consistent")
}

/// Generate a valid chain of `1..=max_len` blocks.
pub fn chain(max_len: usize) -> impl Strategy<Value = Vec<Block>> {
    (
        keypair(),
        prop::collection::vec((timestamp(), seals(2)), 1..=max_len),
    )
        .prop_map(|(keypair, specs)| {
            let identity = SignerIdentity::new("Custodian", "proptest");
            let mut blocks: Vec<Block> = Vec::with_capacity(specs.len());
            for (timestamp, seals) in specs {
                let tip = blocks.last().map(Block::tip);
                let block = BlockBuilder::from_tip(tip.as_ref())
                    .timestamp(timestamp)
                    .seals(seals)
                    .sign(&keypair, &identity)
                    .expect("builder positions follow the tip");
                blocks.push(block);
            }
            blocks
        })
}
