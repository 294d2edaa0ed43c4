//! # tessera-rlp
//!
//! Thin layer over the `rlp` crate for the shapes block headers and
//! transactions need beyond a plain `Encodable` impl: byte strings that
//! must not be encoded as lists, nullable recipients, pre-encoded
//! sub-items and lists of 32-byte words.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
pub use tessera_primitives::{Address, Bytes, H256, U256};

/// Encode one value
pub fn encode<T: Encodable>(value: &T) -> Vec<u8> {
    rlp::encode(value).to_vec()
}

/// Decode one value
pub fn decode<T: Decodable>(data: &[u8]) -> Result<T, DecoderError> {
    rlp::decode(data)
}

/// Encode a slice as a list
pub fn encode_list<T: Encodable>(items: &[T]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(items.len());
    items.iter().for_each(|item| {
        stream.append(item);
    });
    stream.out().to_vec()
}

/// Field helpers for [`RlpStream`]
pub mod utils {
    use super::{Address, RlpStream, H256};

    /// Byte string field: code, calldata, extra data
    pub fn append_bytes(s: &mut RlpStream, bytes: &[u8]) {
        s.encoder().encode_value(bytes);
    }

    /// `to` field; contract creation encodes as the empty string
    pub fn append_opt_address(s: &mut RlpStream, to: Option<&Address>) {
        match to {
            Some(address) => s.append(address),
            None => s.append_empty_data(),
        };
    }

    /// Item that is already RLP, such as a nested withdrawal list
    pub fn append_encoded(s: &mut RlpStream, encoded: &[u8]) {
        s.append_raw(encoded, 1);
    }

    /// Blob versioned hashes or access-list storage keys
    pub fn append_hash_list(s: &mut RlpStream, words: &[H256]) {
        s.append_list::<H256, H256>(words);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_field_widths() {
        let hash = encode(&H256::from_bytes([0x42; 32]));
        assert_eq!((hash[0], hash.len()), (0xa0, 33));
        let coinbase = encode(&Address::from_bytes([0x42; 20]));
        assert_eq!((coinbase[0], coinbase.len()), (0x94, 21));
        assert_eq!(decode::<H256>(&hash).unwrap(), H256::from_bytes([0x42; 32]));
    }

    #[test]
    fn test_quantities_are_minimal() {
        assert_eq!(encode(&U256::zero()), vec![0x80]);
        assert_eq!(encode(&0u64), vec![0x80]);
        assert_eq!(encode(&U256::from(15u64)), vec![0x0f]);
        assert_eq!(encode(&21000u64), vec![0x82, 0x52, 0x08]);
    }

    #[test]
    fn test_lists() {
        assert_eq!(encode_list::<u64>(&[]), vec![0xc0]);
        assert_eq!(
            encode_list(&["cat", "dog"]),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
    }

    #[test]
    fn test_contract_creation_recipient() {
        let mut s = RlpStream::new_list(2);
        utils::append_opt_address(&mut s, None);
        utils::append_opt_address(&mut s, Some(&Address::from_low_u64(0x11)));
        let out = s.out();
        let list = Rlp::new(&out);
        assert!(list.at(0).unwrap().is_empty());
        assert_eq!(list.val_at::<Address>(1).unwrap(), Address::from_low_u64(0x11));
    }

    #[test]
    fn test_code_is_a_string() {
        let mut s = RlpStream::new_list(2);
        utils::append_bytes(&mut s, &[0x60, 0x00]);
        utils::append_bytes(&mut s, &[]);
        assert_eq!(s.out().to_vec(), vec![0xc4, 0x82, 0x60, 0x00, 0x80]);
    }

    #[test]
    fn test_word_lists_and_raw_items() {
        let mut s = RlpStream::new();
        utils::append_hash_list(&mut s, &[H256::ZERO]);
        let out = s.out();
        assert_eq!((out[0], out.len()), (0xe1, 34));

        let mut s = RlpStream::new_list(1);
        utils::append_encoded(&mut s, &encode_list(&[1u64, 2u64]));
        assert_eq!(s.out().to_vec(), vec![0xc3, 0xc2, 0x01, 0x02]);
    }
}
