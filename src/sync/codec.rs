//! Wire codec
//!
//! A datagram is the whole record store, one record after another, with no
//! header or trailer:
//!
//! ```text
//! +0       Name (N bytes, no NUL)
//! +N       0x00
//! +N+1     Size (4 bytes, i32, native endian)
//! +N+5     Payload (Size bytes)
//! ...      next record
//! ```
//!
//! The size field uses the host's byte order, so master and slaves must share
//! endianness.

use crate::core::constants::{MAX_NAME_LEN, NAME_TERMINATOR, SIZE_FIELD_LEN};
use crate::core::{DecodeError, SyncError};

use super::store::RecordStore;

/// A record borrowed from a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedRecord<'a> {
    /// Record name.
    pub name: &'a str,
    /// Record payload.
    pub payload: &'a [u8],
}

/// Exact number of bytes [`encode`] produces for `store`.
pub fn encoded_len(store: &RecordStore) -> usize {
    store
        .iter()
        .map(|r| r.name().len() + 1 + SIZE_FIELD_LEN + r.size())
        .sum()
}

/// Serialize every record in store order into one buffer.
pub fn encode(store: &RecordStore) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(store));
    for record in store.iter() {
        buf.extend_from_slice(record.name().as_bytes());
        buf.push(NAME_TERMINATOR);
        // The store caps payloads at i32::MAX
        buf.extend_from_slice(&(record.size() as i32).to_ne_bytes());
        buf.extend_from_slice(record.payload());
    }
    buf
}

/// Parse a datagram into its records.
///
/// The whole buffer must be consumed; any truncation is an error and nothing
/// past the failure point is recovered.
pub fn decode(data: &[u8]) -> Result<Vec<DecodedRecord<'_>>, DecodeError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let rest = &data[offset..];
        let name_len = rest
            .iter()
            .position(|&b| b == NAME_TERMINATOR)
            .ok_or(DecodeError::UnterminatedName { offset })?;
        if name_len > MAX_NAME_LEN {
            return Err(DecodeError::InvalidName { offset });
        }
        let name = std::str::from_utf8(&rest[..name_len])
            .map_err(|_| DecodeError::InvalidName { offset })?;
        offset += name_len + 1;

        let size_bytes: [u8; SIZE_FIELD_LEN] = data
            .get(offset..offset + SIZE_FIELD_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(DecodeError::Truncated {
                offset,
                needed: SIZE_FIELD_LEN,
                remaining: data.len() - offset,
            })?;
        let size = i32::from_ne_bytes(size_bytes);
        let size = usize::try_from(size).map_err(|_| DecodeError::NegativeSize {
            name: name.to_owned(),
            size,
        })?;
        offset += SIZE_FIELD_LEN;

        let payload = offset
            .checked_add(size)
            .and_then(|end| data.get(offset..end))
            .ok_or(DecodeError::Truncated {
                offset,
                needed: size,
                remaining: data.len() - offset,
            })?;
        offset += size;

        records.push(DecodedRecord { name, payload });
    }

    Ok(records)
}

/// Decode a datagram and write each record into `store`.
///
/// Records missing from the datagram keep their previous value. The datagram
/// is fully decoded before the store is touched, so a malformed datagram
/// changes nothing. Returns the number of records applied.
pub fn merge(store: &mut RecordStore, data: &[u8]) -> Result<usize, SyncError> {
    let records = decode(data)?;
    for record in &records {
        store.write(record.name, record.payload)?;
    }
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store_of(entries: &[(&str, &[u8])]) -> RecordStore {
        let mut store = RecordStore::new();
        for (name, payload) in entries {
            store.write(name, payload).unwrap();
        }
        store
    }

    #[test]
    fn test_encode_layout() {
        let store = store_of(&[("ab", &[7, 8, 9])]);
        let encoded = encode(&store);

        let mut expected = vec![b'a', b'b', 0];
        expected.extend_from_slice(&3i32.to_ne_bytes());
        expected.extend_from_slice(&[7, 8, 9]);
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), encoded_len(&store));
    }

    #[test]
    fn test_encode_empty_store() {
        let store = RecordStore::new();
        assert!(encode(&store).is_empty());
        assert_eq!(encoded_len(&store), 0);
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let store = store_of(&[("x", &[1]), ("y", &[2, 3])]);
        assert_eq!(encode(&store), encode(&store.clone()));
    }

    #[test]
    fn test_decode_preserves_order() {
        let store = store_of(&[("first", &[1]), ("second", &[]), ("third", &[3, 3])]);
        let encoded = encode(&store);
        let decoded = decode(&encoded).unwrap();

        assert_eq!(
            decoded,
            vec![
                DecodedRecord { name: "first", payload: &[1] },
                DecodedRecord { name: "second", payload: &[] },
                DecodedRecord { name: "third", payload: &[3, 3] },
            ]
        );
    }

    #[test]
    fn test_decode_unterminated_name() {
        let result = decode(b"abc");
        assert_eq!(result, Err(DecodeError::UnterminatedName { offset: 0 }));
    }

    #[test]
    fn test_decode_truncated_size() {
        let data = [b'a', 0, 1, 0];
        assert!(matches!(
            decode(&data),
            Err(DecodeError::Truncated { offset: 2, needed: 4, remaining: 2 })
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let store = store_of(&[("a", &[1, 2, 3, 4])]);
        let mut encoded = encode(&store);
        encoded.truncate(encoded.len() - 1);

        assert!(matches!(
            decode(&encoded),
            Err(DecodeError::Truncated { needed: 4, remaining: 3, .. })
        ));
    }

    #[test]
    fn test_decode_negative_size() {
        let mut data = vec![b'a', 0];
        data.extend_from_slice(&(-1i32).to_ne_bytes());
        assert!(matches!(
            decode(&data),
            Err(DecodeError::NegativeSize { size: -1, .. })
        ));
    }

    #[test]
    fn test_decode_invalid_utf8_name() {
        let mut data = vec![0xFF, 0];
        data.extend_from_slice(&0i32.to_ne_bytes());
        assert_eq!(decode(&data), Err(DecodeError::InvalidName { offset: 0 }));
    }

    #[test]
    fn test_merge_keeps_unsent_records() {
        let mut slave = store_of(&[("kept", &[1]), ("counter", &[0])]);
        let packet = encode(&store_of(&[("counter", &[5]), ("new", &[9, 9])]));

        assert_eq!(merge(&mut slave, &packet).unwrap(), 2);
        assert_eq!(slave.get("kept"), Some(&[1u8][..]));
        assert_eq!(slave.get("counter"), Some(&[5u8][..]));
        assert_eq!(slave.get("new"), Some(&[9u8, 9][..]));
    }

    #[test]
    fn test_merge_malformed_leaves_store_untouched() {
        let mut slave = store_of(&[("counter", &[0])]);
        let mut packet = encode(&store_of(&[("counter", &[5]), ("tail", &[1, 2])]));
        packet.pop();

        assert!(merge(&mut slave, &packet).is_err());
        assert_eq!(slave.get("counter"), Some(&[0u8][..]));
        assert_eq!(slave.len(), 1);
    }

    #[test]
    fn test_merge_respects_capacity() {
        let mut slave = RecordStore::with_capacity(1);
        let packet = encode(&store_of(&[("a", &[1]), ("b", &[2])]));

        let err = merge(&mut slave, &packet).unwrap_err();
        assert!(err.is_fatal());
    }

    fn entries() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
        prop::collection::btree_map("[a-z_]{1,16}", prop::collection::vec(any::<u8>(), 0..64), 0..16)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn merge_reproduces_records(entries in entries(), reverse in any::<bool>()) {
            let mut master = RecordStore::new();
            let ordered: Vec<_> = if reverse {
                entries.iter().rev().collect()
            } else {
                entries.iter().collect()
            };
            for (name, payload) in &ordered {
                master.write(name, payload).unwrap();
            }

            let mut slave = RecordStore::new();
            merge(&mut slave, &encode(&master)).unwrap();

            prop_assert_eq!(slave.len(), entries.len());
            for (name, payload) in &entries {
                prop_assert_eq!(slave.get(name), Some(payload.as_slice()));
            }
        }

        #[test]
        fn merge_is_idempotent(entries in entries()) {
            let mut master = RecordStore::new();
            for (name, payload) in &entries {
                master.write(name, payload).unwrap();
            }
            let packet = encode(&master);

            let mut slave = RecordStore::new();
            merge(&mut slave, &packet).unwrap();
            let once = encode(&slave);
            merge(&mut slave, &packet).unwrap();

            prop_assert_eq!(encode(&slave), once);
        }
    }
}
