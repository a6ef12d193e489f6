//! Composite ledger keys
//!
//! A composite key packs a namespace and an ordered tuple of string components
//! into one binary key:
//!
//! ```text
//! 0x00 | len(namespace) | namespace | len(c1) | c1 | len(c2) | c2 | ...
//! ```
//!
//! Every length is a big-endian `u32`. Because each component is fully
//! delimited, the encoding of a leading subsequence is a byte prefix of the
//! encoding of the whole tuple and of nothing else, which is what makes
//! partial-key range scans exact.
//!
//! ```rust
//! use ballot_ledger::keys::{self, KeySchema};
//!
//! let votes = KeySchema::new("Vote", 3);
//! let key = votes.encode(&["Q1", "OrgA", "alice"]).unwrap();
//! assert_eq!(votes.decode(&key).unwrap(), vec!["Q1", "OrgA", "alice"]);
//!
//! let range = votes.scan_prefix(&["Q1"]).unwrap();
//! assert!(range.contains(&key));
//! assert_ne!(
//!     keys::encode("Vote", &["ab", "c"]).unwrap(),
//!     keys::encode("Vote", &["a", "bc"]).unwrap(),
//! );
//! ```

use crate::{Error, Result, invalid_argument};
use serde::{Deserialize, Serialize};

/// First byte of every composite key. Simple keys must not start with it.
pub const COMPOSITE_KEY_MARKER: u8 = 0x00;

const LENGTH_PREFIX_BYTES: usize = 4;

/// Half-open byte range `[start, end)` handed to the ledger's range iterator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub start: Vec<u8>,
    /// `None` means unbounded above
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    /// Range covering every key that starts with `prefix`
    pub fn prefix(prefix: Vec<u8>) -> Self {
        let end = successor(&prefix);
        Self { start: prefix, end }
    }

    /// Whether `key` falls inside the range
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().is_none_or(|end| key < end)
    }
}

/// Encode a namespace and component tuple into a composite key
pub fn encode<S: AsRef<str>>(namespace: &str, parts: &[S]) -> Result<Vec<u8>> {
    let capacity = 1
        + LENGTH_PREFIX_BYTES
        + namespace.len()
        + parts
            .iter()
            .map(|p| LENGTH_PREFIX_BYTES + p.as_ref().len())
            .sum::<usize>();

    let mut key = Vec::with_capacity(capacity);
    key.push(COMPOSITE_KEY_MARKER);
    push_component(&mut key, namespace.as_bytes())?;
    for part in parts {
        push_component(&mut key, part.as_ref().as_bytes())?;
    }
    Ok(key)
}

/// Decode a composite key produced by [`encode`] for `namespace`
pub fn decode(namespace: &str, key: &[u8]) -> Result<Vec<String>> {
    let rest = key
        .strip_prefix(&[COMPOSITE_KEY_MARKER])
        .ok_or_else(|| Error::key_decode("missing composite key marker"))?;

    let (found, mut rest) = read_component(rest)?;
    if found != namespace.as_bytes() {
        return Err(Error::key_decode(format!(
            "namespace mismatch: expected '{}', found '{}'",
            namespace,
            String::from_utf8_lossy(found)
        )));
    }

    let mut parts = Vec::new();
    while !rest.is_empty() {
        let (component, tail) = read_component(rest)?;
        let component = std::str::from_utf8(component)
            .map_err(|e| Error::key_decode(format!("component is not UTF-8: {e}")))?;
        parts.push(component.to_string());
        rest = tail;
    }
    Ok(parts)
}

/// Range of every key in `namespace` whose components start with `prefix`
pub fn scan_prefix<S: AsRef<str>>(namespace: &str, prefix: &[S]) -> Result<KeyRange> {
    Ok(KeyRange::prefix(encode(namespace, prefix)?))
}

/// A namespace bound to a fixed number of key components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    namespace: String,
    arity: usize,
}

impl KeySchema {
    pub fn new(namespace: impl Into<String>, arity: usize) -> Self {
        Self {
            namespace: namespace.into(),
            arity,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Encode a full key; exactly `arity` components are required
    pub fn encode<S: AsRef<str>>(&self, parts: &[S]) -> Result<Vec<u8>> {
        if parts.len() != self.arity {
            return Err(invalid_argument!(
                "{} key needs {} components, got {}",
                self.namespace,
                self.arity,
                parts.len()
            ));
        }
        encode(&self.namespace, parts)
    }

    /// Decode a full key, rejecting keys with the wrong component count
    pub fn decode(&self, key: &[u8]) -> Result<Vec<String>> {
        let parts = decode(&self.namespace, key)?;
        if parts.len() != self.arity {
            return Err(self.arity_mismatch(parts.len(), self.arity));
        }
        Ok(parts)
    }

    /// Decode a full key straight into its `N` components
    pub fn decode_fixed<const N: usize>(&self, key: &[u8]) -> Result<[String; N]> {
        self.decode(key)?
            .try_into()
            .map_err(|parts: Vec<String>| self.arity_mismatch(parts.len(), N))
    }

    fn arity_mismatch(&self, found: usize, expected: usize) -> Error {
        Error::key_decode(format!(
            "{} key has {found} components, expected {expected}",
            self.namespace
        ))
    }

    /// Scan range for a leading subsequence of at most `arity` components
    pub fn scan_prefix<S: AsRef<str>>(&self, prefix: &[S]) -> Result<KeyRange> {
        if prefix.len() > self.arity {
            return Err(invalid_argument!(
                "{} scan prefix allows at most {} components, got {}",
                self.namespace,
                self.arity,
                prefix.len()
            ));
        }
        scan_prefix(&self.namespace, prefix)
    }
}

fn push_component(key: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| invalid_argument!("key component of {} bytes is too long", bytes.len()))?;
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(bytes);
    Ok(())
}

fn read_component(buf: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = buf
        .split_first_chunk::<LENGTH_PREFIX_BYTES>()
        .ok_or_else(|| Error::key_decode("truncated length prefix"))?;
    let len = u32::from_be_bytes(*len) as usize;
    if rest.len() < len {
        return Err(Error::key_decode(format!(
            "component claims {} bytes but only {} remain",
            len,
            rest.len()
        )));
    }
    Ok(rest.split_at(len))
}

/// Smallest byte string greater than every string starting with `prefix`
fn successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NS: &str = "Vote";

    #[test]
    fn test_component_boundaries_are_unambiguous() {
        let ab_c = encode(NS, &["ab", "c"]).unwrap();
        let a_bc = encode(NS, &["a", "bc"]).unwrap();
        assert_ne!(ab_c, a_bc);
        assert_eq!(decode(NS, &ab_c).unwrap(), vec!["ab", "c"]);
        assert_eq!(decode(NS, &a_bc).unwrap(), vec!["a", "bc"]);
    }

    #[test]
    fn test_layout() {
        let key = encode("V", &["Q"]).unwrap();
        assert_eq!(key, vec![0x00, 0, 0, 0, 1, b'V', 0, 0, 0, 1, b'Q']);
    }

    #[test]
    fn test_empty_components_round_trip() {
        let key = encode(NS, &["", "OrgA", ""]).unwrap();
        assert_eq!(decode(NS, &key).unwrap(), vec!["", "OrgA", ""]);
    }

    #[test]
    fn test_decode_rejects_foreign_keys() {
        let key = encode(NS, &["Q1", "OrgA", "alice"]).unwrap();

        // Different namespace
        assert!(matches!(decode("Votes", &key), Err(Error::KeyDecode { .. })));
        // Simple key
        assert!(matches!(decode(NS, b"allowedOrgs"), Err(Error::KeyDecode { .. })));
        // Truncated inside a component
        assert!(matches!(
            decode(NS, &key[..key.len() - 1]),
            Err(Error::KeyDecode { .. })
        ));
        // Truncated inside a length prefix
        let mut short = encode(NS, &["Q1"]).unwrap();
        short.extend_from_slice(&[0, 0]);
        assert!(matches!(decode(NS, &short), Err(Error::KeyDecode { .. })));
        // Invalid UTF-8 component
        let mut bad = encode(NS, &[] as &[&str]).unwrap();
        bad.extend_from_slice(&[0, 0, 0, 1, 0xff]);
        assert!(matches!(decode(NS, &bad), Err(Error::KeyDecode { .. })));
    }

    #[test]
    fn test_namespace_prefix_does_not_leak() {
        let range = scan_prefix("Vote", &[] as &[&str]).unwrap();
        let other = encode("Votes", &["Q1", "OrgA", "alice"]).unwrap();
        assert!(!range.contains(&other));
    }

    #[test]
    fn test_question_prefix_does_not_match_longer_question() {
        let schema = KeySchema::new(NS, 3);
        let range = schema.scan_prefix(&["Q1"]).unwrap();

        assert!(range.contains(&schema.encode(&["Q1", "OrgA", "alice"]).unwrap()));
        assert!(range.contains(&schema.encode(&["Q1", "", ""]).unwrap()));
        assert!(!range.contains(&schema.encode(&["Q10", "OrgA", "alice"]).unwrap()));
        assert!(!range.contains(&schema.encode(&["Q", "1OrgA", "alice"]).unwrap()));
    }

    #[test]
    fn test_full_length_prefix_matches_exact_key() {
        let schema = KeySchema::new(NS, 3);
        let key = schema.encode(&["Q1", "OrgA", "alice"]).unwrap();
        let range = schema.scan_prefix(&["Q1", "OrgA", "alice"]).unwrap();
        assert!(range.contains(&key));
        assert!(!range.contains(&schema.encode(&["Q1", "OrgA", "alicia"]).unwrap()));
    }

    #[test]
    fn test_schema_arity() {
        let schema = KeySchema::new(NS, 3);
        assert!(matches!(
            schema.encode(&["Q1", "OrgA"]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            schema.scan_prefix(&["a", "b", "c", "d"]),
            Err(Error::InvalidArgument { .. })
        ));

        let short = encode(NS, &["Q1", "OrgA"]).unwrap();
        assert!(matches!(schema.decode(&short), Err(Error::KeyDecode { .. })));
        assert!(matches!(
            schema.decode_fixed::<3>(&short),
            Err(Error::KeyDecode { .. })
        ));
    }

    #[test]
    fn test_decode_fixed() {
        let schema = KeySchema::new(NS, 3);
        let key = schema.encode(&["Q1", "OrgA", "alice"]).unwrap();

        let [question, organization, user] = schema.decode_fixed::<3>(&key).unwrap();
        assert_eq!(
            (question.as_str(), organization.as_str(), user.as_str()),
            ("Q1", "OrgA", "alice")
        );

        // Destructuring width must agree with the schema arity
        let err = schema.decode_fixed::<2>(&key).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn test_successor() {
        assert_eq!(successor(&[0x00, 0x01]), Some(vec![0x00, 0x02]));
        assert_eq!(successor(&[0x00, 0xff]), Some(vec![0x01]));
        assert_eq!(successor(&[0xff, 0xff]), None);
        assert_eq!(successor(&[]), None);

        let unbounded = KeyRange::prefix(vec![0xff]);
        assert!(unbounded.end.is_none());
        assert!(unbounded.contains(&[0xff, 0xff, 0x01]));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(parts in proptest::collection::vec(".{0,8}", 0..5)) {
            let key = encode(NS, &parts).unwrap();
            prop_assert_eq!(decode(NS, &key).unwrap(), parts);
        }

        #[test]
        fn prop_distinct_tuples_never_collide(
            a in proptest::collection::vec("[ab]{0,2}", 3),
            b in proptest::collection::vec("[ab]{0,2}", 3),
        ) {
            let key_a = encode(NS, &a).unwrap();
            let key_b = encode(NS, &b).unwrap();
            prop_assert_eq!(key_a == key_b, a == b);
        }

        #[test]
        fn prop_prefix_scan_is_exact(
            probe in proptest::collection::vec("[ab]{0,2}", 3),
            stored in proptest::collection::vec("[ab]{0,2}", 3),
            len in 0usize..=3,
        ) {
            let schema = KeySchema::new(NS, 3);
            let range = schema.scan_prefix(&probe[..len]).unwrap();
            let key = schema.encode(&stored).unwrap();
            prop_assert_eq!(range.contains(&key), stored[..len] == probe[..len]);
        }
    }
}
