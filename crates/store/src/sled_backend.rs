use crate::backend::StoreBackend;
use crate::error::{Result, StoreError};
use crate::model::{Entry, EntryId, Modification, ROOT_PARENT};
use directoryd_dn::{Dn, Style};
use directoryd_matching::MatchingRule;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Tells the store which attributes get an equality posting list and which
/// matching rule normalizes their values for that index. Attributes absent
/// from this map are still presence-indexed but not equality-indexed,
/// mirroring how a real directory only builds the indices an admin
/// configures.
#[derive(Default, Clone)]
pub struct IndexPolicy {
    pub equality_rules: HashMap<String, Arc<dyn MatchingRule>>,
}

impl IndexPolicy {
    pub fn with_rule(mut self, attr_oid: impl Into<String>, rule: Arc<dyn MatchingRule>) -> Self {
        self.equality_rules.insert(attr_oid.into(), rule);
        self
    }
}

/// The default, native on-disk [`StoreBackend`]: one master `sled::Tree`
/// plus one tree per secondary index, composed from one `sled::Db`,
/// mirroring how the teacher's `Backend` derives `Docs`/`Crdt` typed views
/// over trees opened from a single `sled::Db`.
///
/// Cross-tree commit atomicity is approximated with a single exclusive
/// writer lock rather than sled's multi-tree transaction API: every
/// mutating method takes `write_lock` for its whole duration, so no reader
/// can observe a write to one tree without the sibling writes that must
/// accompany it. `alias`/`oneAlias`/`subAlias` consistency after a
/// structural change (add/delete/rename/move) is restored by a full
/// rebuild of the two derived alias indices rather than incremental
/// patching — O(entries) per structural change, acceptable here since
/// this is a teaching-scale core, not a performance-tuned production
/// store.
pub struct SledBackend {
    #[allow(dead_code)]
    db: sled::Db,
    master: sled::Tree,
    ndn: sled::Tree,
    updn: sled::Tree,
    parent: sled::Tree,
    children: sled::Tree,
    presence: sled::Tree,
    equality: sled::Tree,
    alias: sled::Tree,
    one_alias: sled::Tree,
    sub_alias: sled::Tree,
    meta: sled::Tree,
    policy: IndexPolicy,
    write_lock: Mutex<()>,
}

fn id_bytes(id: EntryId) -> [u8; 8] {
    id.to_be_bytes()
}

fn id_from_bytes(b: &[u8]) -> EntryId {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&b[..8]);
    u64::from_be_bytes(buf)
}

fn pair_key(a: EntryId, b: EntryId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&id_bytes(a));
    key[8..].copy_from_slice(&id_bytes(b));
    key
}

fn attr_key_prefix(attr_oid: &str) -> Vec<u8> {
    let mut k = attr_oid.as_bytes().to_vec();
    k.push(0);
    k
}

fn presence_key(attr_oid: &str, id: EntryId) -> Vec<u8> {
    let mut k = attr_key_prefix(attr_oid);
    k.extend_from_slice(&id_bytes(id));
    k
}

fn equality_key(attr_oid: &str, normalized: &[u8], id: EntryId) -> Vec<u8> {
    let mut k = attr_key_prefix(attr_oid);
    k.extend_from_slice(normalized);
    k.push(0);
    k.extend_from_slice(&id_bytes(id));
    k
}

fn equality_prefix(attr_oid: &str, normalized: &[u8]) -> Vec<u8> {
    let mut k = attr_key_prefix(attr_oid);
    k.extend_from_slice(normalized);
    k.push(0);
    k
}

impl SledBackend {
    pub fn open(db: sled::Db, policy: IndexPolicy) -> Result<Self> {
        Ok(SledBackend {
            master: db.open_tree("master")?,
            ndn: db.open_tree("ndn")?,
            updn: db.open_tree("updn")?,
            parent: db.open_tree("parent")?,
            children: db.open_tree("children")?,
            presence: db.open_tree("presence")?,
            equality: db.open_tree("equality")?,
            alias: db.open_tree("alias")?,
            one_alias: db.open_tree("one_alias")?,
            sub_alias: db.open_tree("sub_alias")?,
            meta: db.open_tree("meta")?,
            db,
            policy,
            write_lock: Mutex::new(()),
        })
    }

    pub fn temporary(policy: IndexPolicy) -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::open(db, policy)
    }

    fn alloc_id(&self) -> Result<EntryId> {
        let current = match self.meta.get(b"next_id")? {
            Some(v) => id_from_bytes(&v),
            None => 1,
        };
        self.meta.insert(b"next_id", id_bytes(current + 1))?;
        Ok(current)
    }

    fn get_entry(&self, id: EntryId) -> Result<Entry> {
        let bytes = self
            .master
            .get(id_bytes(id))?
            .ok_or_else(|| StoreError::NoSuchEntry(format!("id {id}")))?;
        Ok(bincode::deserialize(&bytes)?)
    }

    fn get_parent(&self, id: EntryId) -> Result<EntryId> {
        match self.parent.get(id_bytes(id))? {
            Some(v) => Ok(id_from_bytes(&v)),
            None => Err(StoreError::NoSuchEntry(format!("id {id}"))),
        }
    }

    fn id_for_ndn(&self, dn: &Dn) -> Result<Option<EntryId>> {
        let key = dn.render(Style::Normalized).into_bytes();
        Ok(self.ndn.get(key)?.map(|v| id_from_bytes(&v)))
    }

    fn dn_for_id_raw(&self, id: EntryId) -> Result<Dn> {
        let bytes = self
            .updn
            .get(id_bytes(id))?
            .ok_or_else(|| StoreError::NoSuchEntry(format!("id {id}")))?;
        let s = String::from_utf8_lossy(&bytes).into_owned();
        Ok(directoryd_dn::parse(&s)?)
    }

    fn index_entry(&self, id: EntryId, entry: &Entry) -> Result<()> {
        for (attr, values) in &entry.attrs {
            self.presence.insert(presence_key(attr, id), &b""[..])?;
            if let Some(rule) = self.policy.equality_rules.get(attr) {
                for v in values {
                    let norm = rule.normalize(v);
                    self.equality.insert(equality_key(attr, &norm, id), &b""[..])?;
                }
            }
        }
        Ok(())
    }

    fn unindex_entry(&self, id: EntryId, entry: &Entry) -> Result<()> {
        for (attr, values) in &entry.attrs {
            self.presence.remove(presence_key(attr, id))?;
            if let Some(rule) = self.policy.equality_rules.get(attr) {
                for v in values {
                    let norm = rule.normalize(v);
                    self.equality.remove(equality_key(attr, &norm, id))?;
                }
            }
        }
        Ok(())
    }

    fn is_descendant(&self, candidate: EntryId, ancestor: EntryId) -> Result<bool> {
        let mut cur = candidate;
        loop {
            if cur == ancestor {
                return Ok(true);
            }
            let p = self.get_parent(cur)?;
            if p == ROOT_PARENT {
                return Ok(false);
            }
            cur = p;
        }
    }

    /// Validates the chain/cycle/suffix-membership invariants for an alias
    /// entry whose target is `target_dn`, per §4.D's add-time alias checks.
    fn validate_alias_target(&self, alias_dn: &Dn, target_dn: &Dn) -> Result<EntryId> {
        let target_id = self
            .id_for_ndn(target_dn)?
            .ok_or_else(|| StoreError::ConstraintViolation(format!("alias target does not exist: {}", target_dn.render(Style::User))))?;
        let target_entry = self.get_entry(target_id)?;
        if target_entry.is_alias() {
            return Err(StoreError::AliasChain(target_dn.render(Style::User)));
        }
        let norm = directoryd_dn::AsciiLowerNormalizer;
        if target_dn.ancestor_of(alias_dn, &norm) || target_dn.equals(alias_dn, &norm) {
            return Err(StoreError::AliasCycle(alias_dn.render(Style::User)));
        }
        Ok(target_id)
    }

    fn rebuild_alias_indices(&self) -> Result<()> {
        self.one_alias.clear()?;
        self.sub_alias.clear()?;
        for kv in self.alias.iter() {
            let (id_key, target_bytes) = kv?;
            let alias_id = id_from_bytes(&id_key);
            let target_dn_str = String::from_utf8_lossy(&target_bytes).into_owned();
            let target_dn = match directoryd_dn::parse(&target_dn_str) {
                Ok(d) => d,
                Err(_) => continue,
            };
            let Some(target_id) = self.id_for_ndn(&target_dn)? else { continue };
            let alias_parent = self.get_parent(alias_id)?;
            let target_parent = self.get_parent(target_id)?;

            if target_parent != alias_parent {
                self.one_alias.insert(pair_key(alias_parent, target_id), &b""[..])?;
            }

            let mut ancestor = self.get_parent(alias_parent).unwrap_or(ROOT_PARENT);
            while ancestor != ROOT_PARENT {
                let ancestor_parent = self.get_parent(ancestor)?;
                if ancestor_parent == ROOT_PARENT {
                    break; // `ancestor` is the partition suffix; excluded by spec
                }
                if !self.is_descendant(target_id, ancestor)? {
                    self.sub_alias.insert(pair_key(ancestor, target_id), &b""[..])?;
                }
                ancestor = ancestor_parent;
            }
        }
        Ok(())
    }

    /// Every AVA in `rdn` as `(attr, value)` pairs — a multi-valued RDN like
    /// `cn=alice+sn=Apple` contributes both components, not just the leading one.
    fn rdn_attr_values(rdn: &directoryd_dn::Rdn) -> Vec<(String, Vec<u8>)> {
        rdn.avas().iter().map(|ava| (ava.attr.clone(), ava.value.clone())).collect()
    }

    fn rewrite_subtree_dns(&self, old_base: &Dn, new_base: &Dn) -> Result<()> {
        let Some(base_id) = self.id_for_ndn(old_base)? else {
            return Err(StoreError::NoSuchEntry(old_base.render(Style::User)));
        };
        let mut stack = vec![(base_id, old_base.clone(), new_base.clone())];
        while let Some((id, old_dn, new_dn)) = stack.pop() {
            let old_key = old_dn.render(Style::Normalized).into_bytes();
            let new_key = new_dn.render(Style::Normalized).into_bytes();
            self.ndn.remove(old_key)?;
            self.ndn.insert(new_key, id_bytes(id))?;
            self.updn.insert(id_bytes(id), new_dn.render(Style::User).into_bytes())?;

            for child in self.children(id)? {
                let child_old_dn = self.dn_for_id_raw(child)?;
                let leaf = child_old_dn.rdn().cloned().expect("child has an RDN");
                let child_new_dn = new_dn.child(leaf);
                stack.push((child, child_old_dn, child_new_dn));
            }
        }
        Ok(())
    }
}

impl StoreBackend for SledBackend {
    fn add(&self, dn: &Dn, mut entry: Entry) -> Result<EntryId> {
        let _guard = self.write_lock.lock();
        let ndn_key = dn.render(Style::Normalized).into_bytes();
        if self.ndn.get(&ndn_key)?.is_some() {
            return Err(StoreError::AlreadyExists(dn.render(Style::User)));
        }

        let parent_id = match dn.parent() {
            None => ROOT_PARENT,
            Some(parent_dn) => match self.id_for_ndn(&parent_dn)? {
                Some(pid) => {
                    if self.get_entry(pid)?.is_alias() {
                        return Err(StoreError::ConstraintViolation(format!(
                            "cannot add beneath alias {}",
                            parent_dn.render(Style::User)
                        )));
                    }
                    pid
                }
                None => {
                    if self.master.is_empty() {
                        ROOT_PARENT
                    } else {
                        return Err(StoreError::NoSuchParent(parent_dn.render(Style::User)));
                    }
                }
            },
        };

        if entry.is_alias() {
            let target = entry
                .alias_target()
                .ok_or_else(|| StoreError::ConstraintViolation("alias entry missing aliasedObjectName".into()))?;
            let target_dn = directoryd_dn::parse(&target)?;
            self.validate_alias_target(dn, &target_dn)?;
        }

        let id = self.alloc_id()?;
        entry
            .display_names
            .entry("objectClass".to_string())
            .or_insert_with(|| "objectClass".to_string());

        self.master.insert(id_bytes(id), bincode::serialize(&entry)?)?;
        self.ndn.insert(ndn_key, id_bytes(id))?;
        self.updn.insert(id_bytes(id), dn.render(Style::User).into_bytes())?;
        self.parent.insert(id_bytes(id), id_bytes(parent_id))?;
        self.children.insert(pair_key(parent_id, id), &b""[..])?;
        self.index_entry(id, &entry)?;

        if let Some(target) = entry.alias_target() {
            self.alias.insert(id_bytes(id), target.into_bytes())?;
        }

        self.rebuild_alias_indices()?;
        Ok(id)
    }

    fn delete(&self, dn: &Dn) -> Result<()> {
        let _guard = self.write_lock.lock();
        let id = self
            .id_for_ndn(dn)?
            .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
        if !self.children(id)?.is_empty() {
            return Err(StoreError::NotAllowedOnNonLeaf(dn.render(Style::User)));
        }
        let entry = self.get_entry(id)?;
        let parent_id = self.get_parent(id)?;

        self.unindex_entry(id, &entry)?;
        self.master.remove(id_bytes(id))?;
        self.ndn.remove(dn.render(Style::Normalized).into_bytes())?;
        self.updn.remove(id_bytes(id))?;
        self.parent.remove(id_bytes(id))?;
        self.children.remove(pair_key(parent_id, id))?;
        self.alias.remove(id_bytes(id))?;

        self.rebuild_alias_indices()?;
        Ok(())
    }

    fn modify(&self, dn: &Dn, mods: &[Modification]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let id = self
            .id_for_ndn(dn)?
            .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
        let old_entry = self.get_entry(id)?;
        let mut new_entry = old_entry.clone();

        for m in mods {
            match m {
                Modification::Add(attr, values) => {
                    let slot = new_entry.attrs.entry(attr.clone()).or_default();
                    for v in values {
                        if !slot.contains(v) {
                            slot.push(v.clone());
                        } else {
                            return Err(StoreError::AttributeOrValueExists(attr.clone()));
                        }
                    }
                }
                Modification::Delete(attr, values) => {
                    if values.is_empty() {
                        if new_entry.attrs.remove(attr).is_none() {
                            return Err(StoreError::NoSuchAttribute(attr.clone()));
                        }
                    } else {
                        let slot = new_entry
                            .attrs
                            .get_mut(attr)
                            .ok_or_else(|| StoreError::NoSuchAttribute(attr.clone()))?;
                        for v in values {
                            let pos = slot
                                .iter()
                                .position(|existing| existing == v)
                                .ok_or_else(|| StoreError::NoSuchAttribute(attr.clone()))?;
                            slot.remove(pos);
                        }
                        if slot.is_empty() {
                            new_entry.attrs.remove(attr);
                        }
                    }
                }
                Modification::Replace(attr, values) => {
                    if values.is_empty() {
                        new_entry.attrs.remove(attr);
                    } else {
                        new_entry.attrs.insert(attr.clone(), values.clone());
                    }
                }
            }
        }

        if !new_entry
            .object_classes()
            .iter()
            .any(|oc| !oc.is_empty())
        {
            return Err(StoreError::SchemaViolation(
                "entry must retain at least one structural object class".into(),
            ));
        }

        self.unindex_entry(id, &old_entry)?;
        self.master.insert(id_bytes(id), bincode::serialize(&new_entry)?)?;
        self.index_entry(id, &new_entry)?;

        match new_entry.alias_target() {
            Some(target) => {
                self.validate_alias_target(dn, &directoryd_dn::parse(&target)?)?;
                self.alias.insert(id_bytes(id), target.into_bytes())?;
            }
            None => {
                self.alias.remove(id_bytes(id))?;
            }
        }
        self.rebuild_alias_indices()?;
        Ok(())
    }

    fn rename(&self, dn: &Dn, new_rdn: &str, delete_old_rdn: bool) -> Result<()> {
        let _guard = self.write_lock.lock();
        let id = self
            .id_for_ndn(dn)?
            .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
        let parent_dn = dn.parent().unwrap_or_else(Dn::root);
        let new_leaf = directoryd_dn::parse(new_rdn)?
            .rdn()
            .cloned()
            .ok_or_else(|| StoreError::ConstraintViolation("empty new RDN".into()))?;
        let new_dn = parent_dn.child(new_leaf.clone());
        if self.id_for_ndn(&new_dn)?.is_some() {
            return Err(StoreError::AlreadyExists(new_dn.render(Style::User)));
        }

        let new_rdn_values = Self::rdn_attr_values(&new_leaf);
        let mut entry = self.get_entry(id)?;
        self.unindex_entry(id, &entry)?;

        if delete_old_rdn {
            if let Some(old_rdn) = dn.rdn() {
                for (old_attr, old_value) in Self::rdn_attr_values(old_rdn) {
                    if let Some(slot) = entry.attrs.get_mut(&old_attr) {
                        slot.retain(|v| v != &old_value);
                        if slot.is_empty() {
                            entry.attrs.remove(&old_attr);
                        }
                    }
                }
            }
        }
        for (new_attr, new_value) in new_rdn_values {
            let slot = entry.attrs.entry(new_attr).or_default();
            if !slot.contains(&new_value) {
                slot.push(new_value);
            }
        }

        self.master.insert(id_bytes(id), bincode::serialize(&entry)?)?;
        self.index_entry(id, &entry)?;
        self.rewrite_subtree_dns(dn, &new_dn)?;
        self.rebuild_alias_indices()?;
        Ok(())
    }

    fn move_entry(&self, dn: &Dn, new_superior: &Dn) -> Result<()> {
        let leaf = dn.rdn().cloned().ok_or_else(|| StoreError::ConstraintViolation("cannot move the root entry".into()))?;
        self.move_and_rename_impl(dn, new_superior, leaf, false)
    }

    fn move_and_rename(
        &self,
        dn: &Dn,
        new_superior: &Dn,
        new_rdn: &str,
        delete_old_rdn: bool,
    ) -> Result<()> {
        let new_leaf = directoryd_dn::parse(new_rdn)?
            .rdn()
            .cloned()
            .ok_or_else(|| StoreError::ConstraintViolation("empty new RDN".into()))?;
        self.move_and_rename_impl(dn, new_superior, new_leaf, delete_old_rdn)
    }

    fn lookup(&self, dn: &Dn) -> Result<(EntryId, Entry)> {
        let id = self
            .id_for_ndn(dn)?
            .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
        Ok((id, self.get_entry(id)?))
    }

    fn lookup_by_id(&self, id: EntryId) -> Result<Entry> {
        self.get_entry(id)
    }

    fn dn_of(&self, id: EntryId) -> Result<Dn> {
        self.dn_for_id_raw(id)
    }

    fn children(&self, parent: EntryId) -> Result<Vec<EntryId>> {
        let prefix = id_bytes(parent);
        let mut out = Vec::new();
        for kv in self.children.scan_prefix(prefix) {
            let (key, _) = kv?;
            out.push(id_from_bytes(&key[8..]));
        }
        Ok(out)
    }

    fn subtree(&self, base: EntryId) -> Result<Vec<EntryId>> {
        let mut out = vec![base];
        let mut frontier = vec![base];
        while let Some(id) = frontier.pop() {
            for child in self.children(id)? {
                out.push(child);
                frontier.push(child);
            }
        }
        Ok(out)
    }

    fn presence(&self, attr_oid: &str) -> Result<Vec<EntryId>> {
        let prefix = attr_key_prefix(attr_oid);
        let mut out = Vec::new();
        for kv in self.presence.scan_prefix(&prefix) {
            let (key, _) = kv?;
            out.push(id_from_bytes(&key[prefix.len()..]));
        }
        Ok(out)
    }

    fn equality(&self, attr_oid: &str, normalized_value: &[u8]) -> Result<Vec<EntryId>> {
        let prefix = equality_prefix(attr_oid, normalized_value);
        let mut out = Vec::new();
        for kv in self.equality.scan_prefix(&prefix) {
            let (key, _) = kv?;
            out.push(id_from_bytes(&key[prefix.len()..]));
        }
        Ok(out)
    }

    fn alias_target(&self, id: EntryId) -> Result<Option<Dn>> {
        match self.alias.get(id_bytes(id))? {
            Some(v) => Ok(Some(directoryd_dn::parse(&String::from_utf8_lossy(&v))?)),
            None => Ok(None),
        }
    }

    fn one_alias(&self, parent: EntryId) -> Result<Vec<EntryId>> {
        let prefix = id_bytes(parent);
        let mut out = Vec::new();
        for kv in self.one_alias.scan_prefix(prefix) {
            let (key, _) = kv?;
            out.push(id_from_bytes(&key[8..]));
        }
        Ok(out)
    }

    fn sub_alias(&self, ancestor: EntryId) -> Result<Vec<EntryId>> {
        let prefix = id_bytes(ancestor);
        let mut out = Vec::new();
        for kv in self.sub_alias.scan_prefix(prefix) {
            let (key, _) = kv?;
            out.push(id_from_bytes(&key[8..]));
        }
        Ok(out)
    }
}

impl SledBackend {
    fn move_and_rename_impl(&self, dn: &Dn, new_superior: &Dn, new_leaf: directoryd_dn::Rdn, delete_old_rdn: bool) -> Result<()> {
        let _guard = self.write_lock.lock();
        let id = self
            .id_for_ndn(dn)?
            .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
        let new_parent_id = self
            .id_for_ndn(new_superior)?
            .ok_or_else(|| StoreError::NoSuchParent(new_superior.render(Style::User)))?;
        if self.get_entry(new_parent_id)?.is_alias() {
            return Err(StoreError::ConstraintViolation("cannot move beneath alias".into()));
        }
        let new_dn = new_superior.child(new_leaf.clone());
        if self.id_for_ndn(&new_dn)?.is_some() {
            return Err(StoreError::AlreadyExists(new_dn.render(Style::User)));
        }

        let old_parent_id = self.get_parent(id)?;
        let mut entry = self.get_entry(id)?;

        let new_rdn_values = Self::rdn_attr_values(&new_leaf);
        self.unindex_entry(id, &entry)?;
        if delete_old_rdn {
            if let Some(old_rdn) = dn.rdn() {
                for (old_attr, old_value) in Self::rdn_attr_values(old_rdn) {
                    if let Some(slot) = entry.attrs.get_mut(&old_attr) {
                        slot.retain(|v| v != &old_value);
                        if slot.is_empty() {
                            entry.attrs.remove(&old_attr);
                        }
                    }
                }
            }
        }
        for (new_attr, new_value) in new_rdn_values {
            let slot = entry.attrs.entry(new_attr).or_default();
            if !slot.contains(&new_value) {
                slot.push(new_value);
            }
        }
        self.master.insert(id_bytes(id), bincode::serialize(&entry)?)?;
        self.index_entry(id, &entry)?;

        self.children.remove(pair_key(old_parent_id, id))?;
        self.parent.insert(id_bytes(id), id_bytes(new_parent_id))?;
        self.children.insert(pair_key(new_parent_id, id), &b""[..])?;

        self.rewrite_subtree_dns(dn, &new_dn)?;
        self.rebuild_alias_indices()?;
        Ok(())
    }
}
