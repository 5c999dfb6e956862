use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An opaque, monotonically-increasing, never-reused entry identity.
pub type EntryId = u64;

/// The sentinel parent id of the root entry.
pub const ROOT_PARENT: EntryId = 0;

/// An attribute value set. Tagged by the caller's matching-rule choice as
/// ordered or unordered; the store itself treats every value set as an
/// unordered `Vec` and leaves ordering semantics to callers (most matching
/// rules are order-insensitive, so duplication elimination happens above
/// this layer where normalization is available).
pub type Values = Vec<Vec<u8>>;

/// A directory entry keyed by attribute-type OID. The user-provided
/// attribute identifier used on write-back is tracked alongside in
/// `display_names` so round-tripping through LDIF preserves casing.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub attrs: BTreeMap<String, Values>,
    pub display_names: BTreeMap<String, String>,
}

impl Entry {
    pub fn get(&self, attr_oid: &str) -> Option<&Values> {
        self.attrs.get(attr_oid)
    }

    pub fn object_classes(&self) -> &[Vec<u8>] {
        self.attrs
            .get("objectClass")
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_alias(&self) -> bool {
        self.object_classes()
            .iter()
            .any(|oc| oc.eq_ignore_ascii_case(b"alias"))
    }

    pub fn alias_target(&self) -> Option<String> {
        if !self.is_alias() {
            return None;
        }
        self.attrs
            .get("aliasedObjectName")
            .and_then(|v| v.first())
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

/// A single primitive modification within a Modify request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Modification {
    Add(String, Values),
    Delete(String, Values),
    Replace(String, Values),
}

/// Search scope, per RFC 4511 §4.5.1.2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Base,
    OneLevel,
    Subtree,
}

/// Alias dereferencing mode, per RFC 4511 §4.5.1.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerefMode {
    Never,
    FindingBase,
    Searching,
    Always,
}

impl DerefMode {
    pub fn deref_while_searching(self) -> bool {
        matches!(self, DerefMode::Searching | DerefMode::Always)
    }

    pub fn deref_finding_base(self) -> bool {
        matches!(self, DerefMode::FindingBase | DerefMode::Always)
    }
}
