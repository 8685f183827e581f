//! Bincode helpers for models that are not bound to a protobuf wire format.
//!
//! All helpers use bincode's standard configuration so every node produces
//! identical bytes for identical values.

use crate::error::{NetabaseError, NetabaseResult};

#[inline]
pub fn encode<V: bincode::Encode>(value: &V) -> NetabaseResult<Vec<u8>> {
    bincode::encode_to_vec(value, bincode::config::standard()).map_err(NetabaseError::from)
}

/// Decode a value, rejecting trailing bytes.
#[inline]
pub fn decode<V: bincode::Decode<()>>(bytes: &[u8]) -> NetabaseResult<V> {
    let (value, read) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
    if read != bytes.len() {
        return Err(NetabaseError::Other(format!(
            "{} trailing bytes after decoded value",
            bytes.len() - read
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encode(&42u64).unwrap();
        assert_eq!(decode::<u64>(&bytes).unwrap(), 42);

        bytes.push(0);
        assert!(decode::<u64>(&bytes).is_err());
    }
}
