//! The metadata dictionary: an ordered, UTF-8 key/value block capped at
//! 2048 bytes, with `fn` reserved for the codec's own use.

use std::collections::BTreeSet;

use crate::errors::PxfError;

/// The only metadata key user input may not set directly; reserved for
/// future codec-internal use. `filename` is conventional, not reserved —
/// `filename` is still accepted and round-trips normally.
pub const RESERVED_KEY: &str = "fn";

/// Maximum serialized size of a metadata block, in bytes.
pub const MAX_METADATA_BYTES: usize = 2048;

/// An ordered key/value dictionary with unique, non-empty UTF-8 keys.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Metadata {
    pairs: Vec<(String, String)>
}

impl Metadata {
    pub fn new() -> Metadata {
        Metadata { pairs: Vec::new() }
    }

    /// Insert a key/value pair, in insertion order. Rejects empty,
    /// duplicate, or reserved keys.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), PxfError> {
        let key = key.into();

        if key.is_empty() {
            return Err(PxfError::InvalidKey("metadata key must not be empty".to_string()));
        }
        if key == RESERVED_KEY {
            return Err(PxfError::InvalidKey(format!("\"{RESERVED_KEY}\" is reserved and cannot be set directly")));
        }
        if self.pairs.iter().any(|(k, _)| k == &key) {
            return Err(PxfError::InvalidKey(format!("duplicate metadata key \"{key}\"")));
        }

        self.pairs.push((key, value.into()));
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Serialize to the on-wire form: a pair-count byte, then
    /// `{u8 key_len, u8 val_len, key_bytes, val_bytes}` per pair.
    pub fn encode(&self) -> Result<Vec<u8>, PxfError> {
        if self.pairs.len() > 255 {
            return Err(PxfError::BadMetadata("more than 255 metadata pairs".to_string()));
        }

        let mut out = Vec::with_capacity(1 + self.pairs.len() * 8);
        out.push(self.pairs.len() as u8);

        for (key, value) in &self.pairs {
            if key.len() > 255 || value.len() > 255 {
                return Err(PxfError::BadMetadata(format!("key/value too long for \"{key}\"")));
            }

            out.push(key.len() as u8);
            out.push(value.len() as u8);
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(value.as_bytes());
        }

        if out.len() > MAX_METADATA_BYTES {
            return Err(PxfError::MetadataTooLarge(out.len()));
        }

        Ok(out)
    }

    /// Parse a metadata block from its wire form, returning the metadata
    /// and the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Metadata, usize), PxfError> {
        if bytes.is_empty() {
            return Err(PxfError::Truncated);
        }

        let count = bytes[0];
        let mut cursor = 1usize;
        let mut metadata = Metadata::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for _ in 0..count {
            if cursor + 2 > bytes.len() {
                return Err(PxfError::Truncated);
            }

            let key_len = usize::from(bytes[cursor]);
            let val_len = usize::from(bytes[cursor + 1]);
            cursor += 2;

            if cursor + key_len + val_len > bytes.len() {
                return Err(PxfError::Truncated);
            }

            let key = std::str::from_utf8(&bytes[cursor..cursor + key_len])
                .map_err(|_| PxfError::BadMetadata("metadata key is not valid UTF-8".to_string()))?
                .to_string();
            cursor += key_len;

            let value = std::str::from_utf8(&bytes[cursor..cursor + val_len])
                .map_err(|_| PxfError::BadMetadata("metadata value is not valid UTF-8".to_string()))?
                .to_string();
            cursor += val_len;

            if key.is_empty() {
                return Err(PxfError::BadMetadata("metadata key must not be empty".to_string()));
            }
            if !seen.insert(key.clone()) {
                return Err(PxfError::BadMetadata(format!("duplicate metadata key \"{key}\"")));
            }

            metadata.pairs.push((key, value));
        }

        Ok((metadata, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_wire_format() {
        let mut md = Metadata::new();
        md.insert("filename", "hi.txt").unwrap();
        md.insert("comment", "").unwrap();

        let bytes = md.encode().unwrap();
        let (decoded, consumed) = Metadata::decode(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, md);
    }

    #[test]
    fn empty_metadata_is_one_zero_byte() {
        let md = Metadata::new();
        assert_eq!(md.encode().unwrap(), vec![0]);

        let (decoded, consumed) = Metadata::decode(&[0]).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(consumed, 1);
    }

    #[test]
    fn reserved_key_is_rejected() {
        let mut md = Metadata::new();
        assert!(md.insert("fn", "x").is_err());
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut md = Metadata::new();
        md.insert("a", "1").unwrap();
        assert!(md.insert("a", "2").is_err());
    }

    #[test]
    fn filename_is_conventional_not_reserved() {
        let mut md = Metadata::new();
        assert!(md.insert("filename", "ok.bin").is_ok());
    }
}
