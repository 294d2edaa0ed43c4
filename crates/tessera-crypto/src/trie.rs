//! Merkle-Patricia trie roots

use hash256_std_hasher::Hash256StdHasher;
use sha3::{
    digest::generic_array::{typenum::consts::U32, GenericArray},
    Digest, Keccak256,
};
use tessera_primitives::H256;

/// Root of the empty trie, `keccak256(rlp(""))`.
pub const EMPTY_ROOT: H256 = H256::from_bytes([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
    0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
    0xb4, 0x21,
]);

/// Trie root of key-value pairs
pub fn trie_root<I, K, V>(input: I) -> H256
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]> + Ord,
    V: AsRef<[u8]>,
{
    to_h256(triehash::trie_root::<KeccakHasher, _, _, _>(input))
}

/// Secure trie root: keys are hashed with keccak-256 before insertion.
/// Used for account state and contract storage.
pub fn sec_trie_root<I, K, V>(input: I) -> H256
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    to_h256(triehash::sec_trie_root::<KeccakHasher, _, _, _>(input))
}

/// Trie root keyed by `rlp(index)`. Used for transactions, receipts and
/// withdrawals.
pub fn ordered_trie_root<I, V>(input: I) -> H256
where
    I: IntoIterator<Item = V>,
    V: AsRef<[u8]>,
{
    to_h256(triehash::ordered_trie_root::<KeccakHasher, I>(input))
}

fn to_h256(out: GenericArray<u8, U32>) -> H256 {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(out.as_slice());
    H256::from_bytes(bytes)
}

struct KeccakHasher;

impl hash_db::Hasher for KeccakHasher {
    type Out = GenericArray<u8, U32>;

    type StdHasher = Hash256StdHasher;

    const LENGTH: usize = 32;

    fn hash(x: &[u8]) -> Self::Out {
        Keccak256::digest(x)
    }
}
