use crate::backend::StoreBackend;
use crate::error::{Result, StoreError};
use crate::model::{Entry, EntryId, Modification, ROOT_PARENT};
use directoryd_dn::{ChangeRecord, Dn, Style};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Reserved characters in an RDN value that must be percent-encoded when
/// used as a filesystem path component, per the partition layout's
/// escaped-RDN-chain naming rule.
fn needs_percent_encoding(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'%' | b'&' | b'(' | b')' | b'*' | b'+' | b'/' | b':' | b';' | b'<' | b'>'
            | b'?' | b'[' | b'\\' | b']' | b'|'
    ) || b <= 0x1f
        || b == 0x7f
}

fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for &b in raw.as_bytes() {
        if needs_percent_encoding(b) {
            out.push_str(&format!("%{b:02X}"));
        } else {
            out.push(b as char);
        }
    }
    out
}

/// An on-disk, human-readable [`StoreBackend`]: every entry is one `.ldif`
/// file named after its own RDN (percent-encoded), nested in a directory
/// tree that mirrors the DIT shape — a sibling directory of the same name
/// holds the entry's children. Moves and renames are filesystem renames of
/// the affected file/directory pair plus a subtree walk to fix up every
/// descendant's recorded DN.
///
/// Indices (`presence`/`equality`/alias posting lists) are not persisted;
/// they're rebuilt into memory from the LDIF tree at [`LdifBackend::open`]
/// and kept in sync in memory thereafter, mirroring how the entire
/// partition doubles as its own recovery log per the on-disk contract.
pub struct LdifBackend {
    root: PathBuf,
    write_lock: Mutex<()>,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    next_id: EntryId,
    entries: HashMap<EntryId, Entry>,
    paths: HashMap<EntryId, PathBuf>,
    dn_to_id: HashMap<String, EntryId>,
    id_to_dn: HashMap<EntryId, Dn>,
    parent: HashMap<EntryId, EntryId>,
    children: HashMap<EntryId, Vec<EntryId>>,
    presence: HashMap<String, Vec<EntryId>>,
    alias: BTreeMap<EntryId, String>,
    one_alias: HashMap<EntryId, Vec<EntryId>>,
    sub_alias: HashMap<EntryId, Vec<EntryId>>,
}

fn entry_file(dir: &Path, leaf: &str) -> PathBuf {
    dir.join(format!("{}.ldif", percent_encode(leaf)))
}

fn entry_dir(dir: &Path, leaf: &str) -> PathBuf {
    dir.join(percent_encode(leaf))
}

fn rdn_leaf_name(dn: &Dn) -> Option<String> {
    dn.rdn().map(|r| r.to_string())
}

impl LdifBackend {
    /// Opens (or creates) an LDIF-backed partition rooted at `root`,
    /// scanning it to rebuild the in-memory indices.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let backend = LdifBackend {
            root,
            write_lock: Mutex::new(()),
            state: RwLock::new(State {
                next_id: 1,
                ..Default::default()
            }),
        };
        backend.rescan()?;
        Ok(backend)
    }

    fn rescan(&self) -> Result<()> {
        let mut state = self.state.write();
        *state = State {
            next_id: 1,
            ..Default::default()
        };
        let root = self.root.clone();
        // Depth-first walk; a `.ldif` file's sibling directory of the same
        // stem (if any) holds its children.
        let mut stack: Vec<(PathBuf, EntryId)> = vec![(root, ROOT_PARENT)];
        while let Some((dir, parent_id)) = stack.pop() {
            let Ok(read_dir) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in read_dir {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("ldif") {
                    continue;
                }
                let bytes = fs::read(&path)?;
                let records = directoryd_dn::parse_ldif(&bytes)
                    .map_err(|e| StoreError::ConstraintViolation(format!("corrupt ldif file {}: {e}", path.display())))?;
                let Some(ChangeRecord::Add { dn, attrs }) = records.into_iter().next() else {
                    continue;
                };
                let id = state.next_id;
                state.next_id += 1;
                let e = Entry {
                    attrs,
                    display_names: BTreeMap::new(),
                };
                let dn_key = dn.render(Style::Normalized);
                state.dn_to_id.insert(dn_key, id);
                state.id_to_dn.insert(id, dn.clone());
                state.parent.insert(id, parent_id);
                state.children.entry(parent_id).or_default().push(id);
                for (attr, _) in &e.attrs {
                    state.presence.entry(attr.clone()).or_default().push(id);
                }
                if e.is_alias() {
                    if let Some(target) = e.alias_target() {
                        state.alias.insert(id, target);
                    }
                }
                state.paths.insert(id, path.clone());
                state.entries.insert(id, e);

                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
                let child_dir = dir.join(&stem);
                if child_dir.is_dir() {
                    stack.push((child_dir, id));
                }
            }
        }
        drop(state);
        self.rebuild_alias_indices()
    }

    fn rebuild_alias_indices(&self) -> Result<()> {
        let mut state = self.state.write();
        state.one_alias.clear();
        state.sub_alias.clear();
        let aliases: Vec<(EntryId, String)> = state.alias.iter().map(|(k, v)| (*k, v.clone())).collect();
        for (alias_id, target) in aliases {
            let Ok(target_dn) = directoryd_dn::parse(&target) else {
                continue;
            };
            let key = target_dn.render(Style::Normalized);
            let Some(&target_id) = state.dn_to_id.get(&key) else {
                continue;
            };
            let Some(&alias_parent) = state.parent.get(&alias_id) else {
                continue;
            };
            let Some(&target_parent) = state.parent.get(&target_id) else {
                continue;
            };
            if target_parent != alias_parent {
                state.one_alias.entry(alias_parent).or_default().push(target_id);
            }
            let mut ancestor = state.parent.get(&alias_parent).copied().unwrap_or(ROOT_PARENT);
            while ancestor != ROOT_PARENT {
                let ancestor_parent = state.parent.get(&ancestor).copied().unwrap_or(ROOT_PARENT);
                if ancestor_parent == ROOT_PARENT {
                    break;
                }
                let is_descendant = {
                    let mut cur = target_id;
                    let mut found = false;
                    loop {
                        if cur == ancestor {
                            found = true;
                            break;
                        }
                        match state.parent.get(&cur) {
                            Some(&p) if p != ROOT_PARENT => cur = p,
                            _ => break,
                        }
                    }
                    found
                };
                if !is_descendant {
                    state.sub_alias.entry(ancestor).or_default().push(target_id);
                }
                ancestor = ancestor_parent;
            }
        }
        Ok(())
    }

    fn path_for(&self, dn: &Dn, parent_dir: &Path) -> PathBuf {
        let leaf = rdn_leaf_name(dn).unwrap_or_default();
        entry_file(parent_dir, &leaf)
    }

    fn dir_for(&self, dn: &Dn, parent_dir: &Path) -> PathBuf {
        let leaf = rdn_leaf_name(dn).unwrap_or_default();
        entry_dir(parent_dir, &leaf)
    }

    fn write_entry_file(&self, path: &Path, dn: &Dn, entry: &Entry) -> Result<()> {
        let record = ChangeRecord::Add {
            dn: dn.clone(),
            attrs: entry.attrs.clone(),
        };
        let bytes = directoryd_dn::render_ldif(&record, 76);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }
}

impl StoreBackend for LdifBackend {
    fn add(&self, dn: &Dn, entry: Entry) -> Result<EntryId> {
        let _guard = self.write_lock.lock();
        {
            let state = self.state.read();
            let key = dn.render(Style::Normalized);
            if state.dn_to_id.contains_key(&key) {
                return Err(StoreError::AlreadyExists(dn.render(Style::User)));
            }
        }

        let parent_dn = dn.parent();
        let (parent_id, parent_dir) = match &parent_dn {
            None => (ROOT_PARENT, self.root.clone()),
            Some(pdn) => {
                let state = self.state.read();
                let key = pdn.render(Style::Normalized);
                match state.dn_to_id.get(&key) {
                    Some(&pid) => {
                        if state.entries.get(&pid).map(|e| e.is_alias()).unwrap_or(false) {
                            return Err(StoreError::ConstraintViolation(format!(
                                "cannot add beneath alias {}",
                                pdn.render(Style::User)
                            )));
                        }
                        let dir = self.dir_for(pdn, state.paths.get(&pid).and_then(|p| p.parent()).unwrap_or(&self.root));
                        (pid, dir)
                    }
                    None => {
                        if state.entries.is_empty() {
                            (ROOT_PARENT, self.root.clone())
                        } else {
                            return Err(StoreError::NoSuchParent(pdn.render(Style::User)));
                        }
                    }
                }
            }
        };

        if entry.is_alias() {
            let target = entry
                .alias_target()
                .ok_or_else(|| StoreError::ConstraintViolation("alias entry missing aliasedObjectName".into()))?;
            let target_dn = directoryd_dn::parse(&target)?;
            let state = self.state.read();
            let key = target_dn.render(Style::Normalized);
            let Some(&target_id) = state.dn_to_id.get(&key) else {
                return Err(StoreError::ConstraintViolation(format!(
                    "alias target does not exist: {}",
                    target_dn.render(Style::User)
                )));
            };
            if state.entries.get(&target_id).map(|e| e.is_alias()).unwrap_or(false) {
                return Err(StoreError::AliasChain(target_dn.render(Style::User)));
            }
            let norm = directoryd_dn::AsciiLowerNormalizer;
            if target_dn.ancestor_of(dn, &norm) || target_dn.equals(dn, &norm) {
                return Err(StoreError::AliasCycle(dn.render(Style::User)));
            }
        }

        let path = self.path_for(dn, &parent_dir);
        self.write_entry_file(&path, dn, &entry)?;

        let mut state = self.state.write();
        let id = state.next_id;
        state.next_id += 1;
        let key = dn.render(Style::Normalized);
        state.dn_to_id.insert(key, id);
        state.id_to_dn.insert(id, dn.clone());
        state.parent.insert(id, parent_id);
        state.children.entry(parent_id).or_default().push(id);
        for (attr, _) in &entry.attrs {
            state.presence.entry(attr.clone()).or_default().push(id);
        }
        if let Some(target) = entry.alias_target() {
            state.alias.insert(id, target);
        }
        state.paths.insert(id, path);
        state.entries.insert(id, entry);
        drop(state);

        self.rebuild_alias_indices()?;
        Ok(id)
    }

    fn delete(&self, dn: &Dn) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut state = self.state.write();
        let key = dn.render(Style::Normalized);
        let id = *state
            .dn_to_id
            .get(&key)
            .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
        if !state.children.get(&id).map(|c| c.is_empty()).unwrap_or(true) {
            return Err(StoreError::NotAllowedOnNonLeaf(dn.render(Style::User)));
        }
        let parent_id = state.parent.remove(&id).unwrap_or(ROOT_PARENT);
        if let Some(siblings) = state.children.get_mut(&parent_id) {
            siblings.retain(|&c| c != id);
        }
        state.dn_to_id.remove(&key);
        state.id_to_dn.remove(&id);
        if let Some(entry) = state.entries.remove(&id) {
            for (attr, _) in &entry.attrs {
                if let Some(list) = state.presence.get_mut(attr) {
                    list.retain(|&x| x != id);
                }
            }
        }
        state.alias.remove(&id);
        if let Some(path) = state.paths.remove(&id) {
            fs::remove_file(&path)?;
        }
        drop(state);
        self.rebuild_alias_indices()
    }

    fn modify(&self, dn: &Dn, mods: &[Modification]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let (id, mut entry, path) = {
            let state = self.state.read();
            let key = dn.render(Style::Normalized);
            let id = *state
                .dn_to_id
                .get(&key)
                .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
            let entry = state.entries.get(&id).cloned().unwrap_or_default();
            let path = state.paths.get(&id).cloned().unwrap_or_default();
            (id, entry, path)
        };

        for m in mods {
            match m {
                Modification::Add(attr, values) => {
                    let slot = entry.attrs.entry(attr.clone()).or_default();
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
                        if entry.attrs.remove(attr).is_none() {
                            return Err(StoreError::NoSuchAttribute(attr.clone()));
                        }
                    } else {
                        let slot = entry
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
                            entry.attrs.remove(attr);
                        }
                    }
                }
                Modification::Replace(attr, values) => {
                    if values.is_empty() {
                        entry.attrs.remove(attr);
                    } else {
                        entry.attrs.insert(attr.clone(), values.clone());
                    }
                }
            }
        }

        if !entry.object_classes().iter().any(|oc| !oc.is_empty()) {
            return Err(StoreError::SchemaViolation(
                "entry must retain at least one structural object class".into(),
            ));
        }

        self.write_entry_file(&path, dn, &entry)?;

        let mut state = self.state.write();
        if let Some(old) = state.entries.get(&id).cloned() {
            for (attr, _) in &old.attrs {
                if let Some(list) = state.presence.get_mut(attr) {
                    list.retain(|&x| x != id);
                }
            }
        }
        for (attr, _) in &entry.attrs {
            state.presence.entry(attr.clone()).or_default().push(id);
        }
        match entry.alias_target() {
            Some(target) => {
                state.alias.insert(id, target);
            }
            None => {
                state.alias.remove(&id);
            }
        }
        state.entries.insert(id, entry);
        drop(state);
        self.rebuild_alias_indices()
    }

    fn rename(&self, dn: &Dn, new_rdn: &str, delete_old_rdn: bool) -> Result<()> {
        let parent_dn = dn.parent().unwrap_or_else(Dn::root);
        self.move_and_rename(dn, &parent_dn, new_rdn, delete_old_rdn)
    }

    fn move_entry(&self, dn: &Dn, new_superior: &Dn) -> Result<()> {
        let leaf = dn
            .rdn()
            .map(|r| r.to_string())
            .ok_or_else(|| StoreError::ConstraintViolation("cannot move the root entry".into()))?;
        self.move_and_rename(dn, new_superior, &leaf, false)
    }

    fn move_and_rename(&self, dn: &Dn, new_superior: &Dn, new_rdn: &str, delete_old_rdn: bool) -> Result<()> {
        let _guard = self.write_lock.lock();
        let new_leaf = directoryd_dn::parse(new_rdn)?
            .rdn()
            .cloned()
            .ok_or_else(|| StoreError::ConstraintViolation("empty new RDN".into()))?;
        let new_dn = new_superior.child(new_leaf.clone());

        let (id, old_parent_id, mut entry, old_path, old_dir) = {
            let state = self.state.read();
            let key = dn.render(Style::Normalized);
            let id = *state
                .dn_to_id
                .get(&key)
                .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
            let new_key = new_dn.render(Style::Normalized);
            if state.dn_to_id.contains_key(&new_key) {
                return Err(StoreError::AlreadyExists(new_dn.render(Style::User)));
            }
            let parent_id = *state.parent.get(&id).unwrap_or(&ROOT_PARENT);
            let entry = state.entries.get(&id).cloned().unwrap_or_default();
            let path = state.paths.get(&id).cloned().unwrap_or_default();
            let dir = path.parent().map(|p| p.join(path.file_stem().unwrap_or_default())).unwrap_or_default();
            (id, parent_id, entry, path, dir)
        };

        let new_parent_id = {
            let state = self.state.read();
            let key = new_superior.render(Style::Normalized);
            let &pid = state
                .dn_to_id
                .get(&key)
                .ok_or_else(|| StoreError::NoSuchParent(new_superior.render(Style::User)))?;
            if state.entries.get(&pid).map(|e| e.is_alias()).unwrap_or(false) {
                return Err(StoreError::ConstraintViolation("cannot move beneath alias".into()));
            }
            pid
        };

        let new_rdn_values = rdn_attr_values(&new_leaf);
        if delete_old_rdn {
            if let Some(old_rdn) = dn.rdn() {
                for (old_attr, old_value) in rdn_attr_values(old_rdn) {
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

        let new_parent_dir = {
            let state = self.state.read();
            state
                .paths
                .get(&new_parent_id)
                .and_then(|p| p.parent())
                .map(|p| p.join(
                    state.paths.get(&new_parent_id).unwrap().file_stem().unwrap_or_default(),
                ))
                .unwrap_or_else(|| self.root.clone())
        };
        let new_path = self.path_for(&new_dn, &new_parent_dir);

        self.write_entry_file(&new_path, &new_dn, &entry)?;
        if old_path != new_path {
            let _ = fs::remove_file(&old_path);
        }
        if old_dir.is_dir() {
            let new_dir = self.dir_for(&new_dn, &new_parent_dir);
            if old_dir != new_dir {
                if let Some(p) = new_dir.parent() {
                    fs::create_dir_all(p)?;
                }
                fs::rename(&old_dir, &new_dir)?;
            }
        }

        self.rewrite_subtree(dn, &new_dn, id, &new_path)?;

        let mut state = self.state.write();
        if let Some(siblings) = state.children.get_mut(&old_parent_id) {
            siblings.retain(|&c| c != id);
        }
        state.children.entry(new_parent_id).or_default().push(id);
        state.parent.insert(id, new_parent_id);
        drop(state);

        self.rebuild_alias_indices()
    }

    fn lookup(&self, dn: &Dn) -> Result<(EntryId, Entry)> {
        let state = self.state.read();
        let key = dn.render(Style::Normalized);
        let id = *state
            .dn_to_id
            .get(&key)
            .ok_or_else(|| StoreError::NoSuchEntry(dn.render(Style::User)))?;
        let entry = state.entries.get(&id).cloned().unwrap_or_default();
        Ok((id, entry))
    }

    fn lookup_by_id(&self, id: EntryId) -> Result<Entry> {
        let state = self.state.read();
        state
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchEntry(format!("id {id}")))
    }

    fn dn_of(&self, id: EntryId) -> Result<Dn> {
        let state = self.state.read();
        state
            .id_to_dn
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchEntry(format!("id {id}")))
    }

    fn children(&self, parent: EntryId) -> Result<Vec<EntryId>> {
        Ok(self.state.read().children.get(&parent).cloned().unwrap_or_default())
    }

    fn subtree(&self, base: EntryId) -> Result<Vec<EntryId>> {
        let state = self.state.read();
        let mut out = vec![base];
        let mut frontier = vec![base];
        while let Some(id) = frontier.pop() {
            if let Some(kids) = state.children.get(&id) {
                for &child in kids {
                    out.push(child);
                    frontier.push(child);
                }
            }
        }
        Ok(out)
    }

    fn presence(&self, attr_oid: &str) -> Result<Vec<EntryId>> {
        Ok(self.state.read().presence.get(attr_oid).cloned().unwrap_or_default())
    }

    fn equality(&self, attr_oid: &str, normalized_value: &[u8]) -> Result<Vec<EntryId>> {
        let state = self.state.read();
        let Some(candidates) = state.presence.get(attr_oid) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for &id in candidates {
            if let Some(entry) = state.entries.get(&id) {
                if let Some(values) = entry.get(attr_oid) {
                    if values.iter().any(|v| v == normalized_value) {
                        out.push(id);
                    }
                }
            }
        }
        Ok(out)
    }

    fn alias_target(&self, id: EntryId) -> Result<Option<Dn>> {
        let state = self.state.read();
        match state.alias.get(&id) {
            Some(target) => Ok(Some(directoryd_dn::parse(target)?)),
            None => Ok(None),
        }
    }

    fn one_alias(&self, parent: EntryId) -> Result<Vec<EntryId>> {
        Ok(self.state.read().one_alias.get(&parent).cloned().unwrap_or_default())
    }

    fn sub_alias(&self, ancestor: EntryId) -> Result<Vec<EntryId>> {
        Ok(self.state.read().sub_alias.get(&ancestor).cloned().unwrap_or_default())
    }
}

impl LdifBackend {
    fn rewrite_subtree(&self, old_base: &Dn, new_base: &Dn, base_id: EntryId, base_path: &Path) -> Result<()> {
        let mut state = self.state.write();
        let old_key = old_base.render(Style::Normalized);
        state.dn_to_id.remove(&old_key);
        state.dn_to_id.insert(new_base.render(Style::Normalized), base_id);
        state.id_to_dn.insert(base_id, new_base.clone());
        state.paths.insert(base_id, base_path.to_path_buf());

        let children = state.children.get(&base_id).cloned().unwrap_or_default();
        drop(state);

        for child in children {
            let child_old_dn = self.dn_of(child)?;
            let leaf = child_old_dn.rdn().cloned().expect("child has an RDN");
            let child_new_dn = new_base.child(leaf);
            let new_dir = base_path.parent().map(|p| p.join(base_path.file_stem().unwrap_or_default())).unwrap_or_default();
            let new_path = self.path_for(&child_new_dn, &new_dir);
            let entry = self.lookup_by_id(child)?;
            self.write_entry_file(&new_path, &child_new_dn, &entry)?;
            self.rewrite_subtree(&child_old_dn, &child_new_dn, child, &new_path)?;
        }
        Ok(())
    }
}

/// Every AVA in `rdn` as `(attr, value)` pairs — a multi-valued RDN like
/// `cn=alice+sn=Apple` contributes both components, not just the leading one.
fn rdn_attr_values(rdn: &directoryd_dn::Rdn) -> Vec<(String, Vec<u8>)> {
    rdn.avas().iter().map(|ava| (ava.attr.clone(), ava.value.clone())).collect()
}
