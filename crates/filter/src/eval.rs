use crate::cursor::{CancellationToken, Cursor};
use crate::error::Result;
use crate::resolver::SchemaContext;
use crate::tree::Filter;
use directoryd_store::{DerefMode, Entry, EntryId, Scope, StoreBackend};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Plans a candidate set for `filter` within `scope`, then re-evaluates the
/// full filter against each candidate (indices may only approximate a
/// leaf — e.g. a substring match beyond the indexed prefix — so the plan is
/// never trusted as the final answer).
pub struct Evaluator {
    pub(crate) store: Arc<dyn StoreBackend>,
    pub(crate) schema: Arc<SchemaContext>,
}

impl Evaluator {
    pub fn new(store: Arc<dyn StoreBackend>, schema: Arc<SchemaContext>) -> Self {
        Evaluator { store, schema }
    }

    pub fn store(&self) -> &Arc<dyn StoreBackend> {
        &self.store
    }

    /// The scope's full candidate universe, with alias dereferencing
    /// applied per `deref`.
    pub fn scope_candidates(&self, base: EntryId, scope: Scope, deref: DerefMode) -> Result<Vec<EntryId>> {
        let mut ids = match scope {
            Scope::Base => vec![base],
            Scope::OneLevel => {
                let mut ids = self.store.children(base)?;
                if deref.deref_while_searching() {
                    ids.extend(self.store.one_alias(base)?);
                }
                ids
            }
            Scope::Subtree => {
                let mut ids = self.store.subtree(base)?;
                if deref.deref_while_searching() {
                    ids.extend(self.store.sub_alias(base)?);
                }
                ids
            }
        };

        if deref.deref_while_searching() {
            let mut resolved = Vec::with_capacity(ids.len());
            for id in ids.drain(..) {
                match self.store.alias_target(id)? {
                    Some(target_dn) => match self.store.lookup(&target_dn) {
                        Ok((target_id, _)) => resolved.push(target_id),
                        Err(_) => continue,
                    },
                    None => resolved.push(id),
                }
            }
            ids = resolved;
        }

        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
        Ok(ids)
    }

    /// Plans and evaluates a search, returning a lazy [`Cursor`] over its
    /// matches. `size_limit`/`time_limit` of `None` mean unbounded;
    /// `cancel` is checked between every candidate.
    pub fn search(
        self: &Arc<Self>,
        base: EntryId,
        scope: Scope,
        deref: DerefMode,
        filter: Filter,
        size_limit: Option<usize>,
        time_limit: Option<Duration>,
        cancel: CancellationToken,
    ) -> Result<Cursor> {
        let universe = self.scope_candidates(base, scope, deref)?;
        let candidates = self.plan(&filter, &universe)?;
        Ok(Cursor::new(self.clone(), filter, candidates, size_limit, time_limit, cancel))
    }

    /// Pushes indexed leaves down to the store's posting lists, narrowing
    /// `scope` into a scannable candidate set. Leaves with no index support
    /// (substring/ordering/approximate/extensible) degenerate to the full
    /// scope; `Not` is never pushed down — its truth is decided entirely by
    /// re-evaluation, so it too returns the full scope.
    pub fn plan(&self, filter: &Filter, scope: &[EntryId]) -> Result<Vec<EntryId>> {
        match filter {
            Filter::Presence(attr) => {
                let resolved = self.schema.resolve(attr)?;
                let posting = self.store.presence(&resolved.key)?;
                Ok(if posting.is_empty() {
                    scope.to_vec()
                } else {
                    intersect(scope, &posting)
                })
            }
            Filter::Equality(attr, value) => {
                let resolved = self.schema.resolve(attr)?;
                let normalized = match &resolved.equality {
                    Some(rule) => rule.normalize(value),
                    None => value.clone(),
                };
                // An empty posting list is ambiguous: it might mean no entry
                // has this value, or it might mean the attribute simply
                // isn't equality-indexed. Either way falling back to the
                // full scope is safe — `matches` re-verifies every
                // candidate — so this never costs correctness, only a
                // wider (but still sound) scan on an un-indexed attribute.
                let posting = self.store.equality(&resolved.key, &normalized)?;
                Ok(if posting.is_empty() {
                    scope.to_vec()
                } else {
                    intersect(scope, &posting)
                })
            }
            Filter::And(parts) => {
                let mut sets = parts
                    .iter()
                    .map(|f| self.plan(f, scope))
                    .collect::<Result<Vec<_>>>()?;
                sets.sort_by_key(|s| s.len());
                let mut iter = sets.into_iter();
                let mut acc = iter.next().unwrap_or_else(|| scope.to_vec());
                for s in iter {
                    acc = intersect(&acc, &s);
                }
                Ok(acc)
            }
            Filter::Or(parts) => {
                let mut out = HashSet::new();
                for f in parts {
                    out.extend(self.plan(f, scope)?);
                }
                Ok(out.into_iter().collect())
            }
            Filter::Substring(_, _) | Filter::Greater(_, _) | Filter::Less(_, _) | Filter::Approx(_, _) | Filter::Extensible(_) | Filter::Not(_) => {
                Ok(scope.to_vec())
            }
        }
    }

    /// Re-evaluates `filter` against the full, current attribute set of
    /// `entry` — the authority on whether a candidate actually matches.
    pub fn matches(&self, filter: &Filter, entry: &Entry) -> Result<bool> {
        Ok(match filter {
            Filter::Presence(attr) => {
                let resolved = self.schema.resolve(attr)?;
                entry.get(&resolved.key).map(|v| !v.is_empty()).unwrap_or(false)
            }
            Filter::Equality(attr, value) => {
                let resolved = self.schema.resolve(attr)?;
                match (entry.get(&resolved.key), &resolved.equality) {
                    (Some(values), Some(rule)) => values.iter().any(|v| rule.equal(v, value)),
                    (Some(values), None) => values.iter().any(|v| v == value),
                    (None, _) => false,
                }
            }
            Filter::Substring(attr, assertion) => {
                let resolved = self.schema.resolve(attr)?;
                let rule = match &resolved.substr {
                    Some(r) => r.clone(),
                    None => return Ok(false),
                };
                match entry.get(&resolved.key) {
                    Some(values) => values.iter().any(|v| assertion.matches(&rule.normalize(v))),
                    None => false,
                }
            }
            Filter::Greater(attr, value) => {
                let resolved = self.schema.resolve(attr)?;
                let rule = match &resolved.ordering {
                    Some(r) => r,
                    None => return Ok(false),
                };
                match entry.get(&resolved.key) {
                    Some(values) => values.iter().any(|v| rule.compare(v, value) != std::cmp::Ordering::Less),
                    None => false,
                }
            }
            Filter::Less(attr, value) => {
                let resolved = self.schema.resolve(attr)?;
                let rule = match &resolved.ordering {
                    Some(r) => r,
                    None => return Ok(false),
                };
                match entry.get(&resolved.key) {
                    Some(values) => values.iter().any(|v| rule.compare(v, value) != std::cmp::Ordering::Greater),
                    None => false,
                }
            }
            Filter::Approx(attr, value) => {
                let resolved = self.schema.resolve(attr)?;
                match entry.get(&resolved.key) {
                    Some(values) => values.iter().any(|v| directoryd_matching::approximate_match(v, value)),
                    None => false,
                }
            }
            Filter::Extensible(ext) => {
                let attrs: Vec<String> = match &ext.attr {
                    Some(a) => vec![a.clone()],
                    None => entry.attrs.keys().cloned().collect(),
                };
                let mut any_match = false;
                for attr in attrs {
                    let Ok(resolved) = self.schema.resolve(&attr) else { continue };
                    let rule = match &ext.rule {
                        Some(name) => self.schema.matching_table().lookup(name).ok(),
                        None => resolved.equality.clone(),
                    };
                    let Some(rule) = rule else { continue };
                    if let Some(values) = entry.get(&resolved.key) {
                        if values.iter().any(|v| rule.equal(v, &ext.value)) {
                            any_match = true;
                            break;
                        }
                    }
                }
                any_match
            }
            Filter::And(parts) => {
                for f in parts {
                    if !self.matches(f, entry)? {
                        return Ok(false);
                    }
                }
                true
            }
            Filter::Or(parts) => {
                for f in parts {
                    if self.matches(f, entry)? {
                        return Ok(true);
                    }
                }
                false
            }
            Filter::Not(inner) => !self.matches(inner, entry)?,
        })
    }
}

fn intersect(a: &[EntryId], b: &[EntryId]) -> Vec<EntryId> {
    let set: HashSet<EntryId> = b.iter().copied().collect();
    a.iter().copied().filter(|id| set.contains(id)).collect()
}
