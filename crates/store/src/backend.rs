use crate::error::Result;
use crate::model::{Entry, EntryId, Modification};
use directoryd_dn::Dn;

/// The entry store's contract. Implemented by [`crate::sled_backend::SledBackend`]
/// (the default, native on-disk form) and [`crate::ldif_backend::LdifBackend`]
/// (the human-readable, one-file-per-entry alternative); both satisfy the same
/// index invariants so callers above this layer (filter evaluation, the
/// interceptor chain) are backend-agnostic.
pub trait StoreBackend: Send + Sync {
    fn add(&self, dn: &Dn, entry: Entry) -> Result<EntryId>;
    fn delete(&self, dn: &Dn) -> Result<()>;
    fn modify(&self, dn: &Dn, mods: &[Modification]) -> Result<()>;
    fn rename(&self, dn: &Dn, new_rdn: &str, delete_old_rdn: bool) -> Result<()>;
    fn move_entry(&self, dn: &Dn, new_superior: &Dn) -> Result<()>;
    fn move_and_rename(
        &self,
        dn: &Dn,
        new_superior: &Dn,
        new_rdn: &str,
        delete_old_rdn: bool,
    ) -> Result<()>;

    fn lookup(&self, dn: &Dn) -> Result<(EntryId, Entry)>;
    fn lookup_by_id(&self, id: EntryId) -> Result<Entry>;
    fn dn_of(&self, id: EntryId) -> Result<Dn>;

    /// Entry-ids directly beneath `parent` (empty for a leaf).
    fn children(&self, parent: EntryId) -> Result<Vec<EntryId>>;
    /// Entry-ids in the transitive closure under `base`, base included.
    fn subtree(&self, base: EntryId) -> Result<Vec<EntryId>>;

    /// Posting list for an attribute-type's presence index.
    fn presence(&self, attr_oid: &str) -> Result<Vec<EntryId>>;
    /// Posting list for an attribute-type's equality index at a normalized value.
    fn equality(&self, attr_oid: &str, normalized_value: &[u8]) -> Result<Vec<EntryId>>;

    /// The alias target DN of `id`, if it is an alias entry.
    fn alias_target(&self, id: EntryId) -> Result<Option<Dn>>;
    /// `oneAlias` posting list: alias targets reachable from one level below `parent`.
    fn one_alias(&self, parent: EntryId) -> Result<Vec<EntryId>>;
    /// `subAlias` posting list: alias targets reachable from the subtree rooted at `ancestor`.
    fn sub_alias(&self, ancestor: EntryId) -> Result<Vec<EntryId>>;
}
