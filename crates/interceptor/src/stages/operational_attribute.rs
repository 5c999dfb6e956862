use super::prelude::*;
use directoryd_auth::render_generalized_time;
use directoryd_store::StoreBackend;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

const OPERATIONAL: &[&str] = &[
    "creatorsName",
    "createTimestamp",
    "modifiersName",
    "modifyTimestamp",
    "entryCSN",
    "pwdChangedTime",
    "pwdAccountLockedTime",
    "pwdFailureTime",
    "pwdHistory",
    "pwdGraceUseTime",
    "pwdReset",
    "pwdLastSuccess",
];

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::<chrono::Utc>::from(SystemTime::now())
}

fn bound_dn_string(ctx: &OperationContext) -> Vec<u8> {
    ctx.principal.dn.as_ref().map(|dn| dn.render(directoryd_dn::Style::User).into_bytes()).unwrap_or_else(|| b"anonymous".to_vec())
}

/// The DN `dn` resolves to after a rename to `new_rdn`, computed the same
/// way [`directoryd_store::sled_backend`]'s own `rename` does: parse
/// `new_rdn` as a one-RDN DN and graft it onto `dn`'s parent.
fn renamed_dn(dn: &directoryd_dn::Dn, new_rdn: &str) -> Option<directoryd_dn::Dn> {
    let parent = dn.parent().unwrap_or_else(directoryd_dn::Dn::root);
    let leaf = directoryd_dn::parse(new_rdn).ok()?.rdn()?.clone();
    Some(parent.child(leaf))
}

/// The DN `dn` resolves to after being moved under `new_superior`, keeping
/// its own leaf RDN.
fn moved_dn(dn: &directoryd_dn::Dn, new_superior: &directoryd_dn::Dn) -> Option<directoryd_dn::Dn> {
    Some(new_superior.child(dn.rdn()?.clone()))
}

/// On add/modify, stamps `creatorsName`/`createTimestamp` (add only),
/// `modifiersName`/`modifyTimestamp` (every write), and `entryCSN` (every
/// write) — the sequence counter appended to `entryCSN` makes two commits
/// landing within the same clock tick still compare unequal, so
/// `pwdChangedTime`/`modifyTimestamp` readers get a well-defined order even
/// under concurrent writers. On search/lookup, strips operational
/// attributes from the response unless the requester's attribute list
/// explicitly named them (`*` alone does not include them, per RFC 4511
/// §4.5.1.8).
pub struct OperationalAttribute {
    store: Arc<dyn StoreBackend>,
    seq: AtomicU64,
}

impl OperationalAttribute {
    pub fn new(store: Arc<dyn StoreBackend>) -> Self {
        OperationalAttribute { store, seq: AtomicU64::new(0) }
    }

    /// `<generalized-time>#<counter>#000#000`, the teacher's generalized-time
    /// stamp extended with a process-wide monotonic counter in place of the
    /// replica/mod-id fields a multi-master deployment would fill in.
    fn csn(&self, stamp: &str) -> Vec<u8> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{stamp}#{seq:06}#000#000").into_bytes()
    }

    fn strip(entry: &mut Entry, requested: &[String]) {
        if requested.iter().any(|a| a == "+" || OPERATIONAL.iter().any(|op| op.eq_ignore_ascii_case(a))) {
            return;
        }
        for attr in OPERATIONAL {
            entry.attrs.remove(*attr);
        }
    }

    /// Stamps `modifiersName`/`modifyTimestamp`/`entryCSN` on the entry now
    /// living at `dn`, via a direct store modify issued after the rename/move
    /// already committed — `Operation::Rename`/`Operation::Move` carry no
    /// `mods` list for `on_modify` to append to, so this is a follow-up write
    /// rather than a rewrite of the in-flight operation.
    fn restamp(&self, ctx: &OperationContext, dn: &directoryd_dn::Dn) {
        let stamp = render_generalized_time(now());
        let actor = bound_dn_string(ctx);
        let mods = vec![
            directoryd_store::Modification::Replace("modifiersName".into(), vec![actor]),
            directoryd_store::Modification::Replace("entryCSN".into(), vec![self.csn(&stamp)]),
            directoryd_store::Modification::Replace("modifyTimestamp".into(), vec![stamp.into_bytes()]),
        ];
        if let Err(e) = self.store.modify(dn, &mods) {
            tracing::warn!(error = %e, dn = %dn.render(directoryd_dn::Style::User), "failed to stamp operational attributes after rename/move");
        }
    }
}

impl Handlers for OperationalAttribute {
    fn on_add(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>) -> Outcome<EntryId> {
        let stamp = render_generalized_time(now());
        let actor = bound_dn_string(ctx);
        if let Operation::Add { entry, .. } = &mut ctx.operation {
            entry.attrs.insert("creatorsName".into(), vec![actor.clone()]);
            entry.attrs.insert("createTimestamp".into(), vec![stamp.clone().into_bytes()]);
            entry.attrs.insert("modifiersName".into(), vec![actor]);
            entry.attrs.insert("entryCSN".into(), vec![self.csn(&stamp)]);
            entry.attrs.insert("modifyTimestamp".into(), vec![stamp.into_bytes()]);
        }
        next(ctx)
    }

    fn on_modify(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let stamp = render_generalized_time(now());
        let actor = bound_dn_string(ctx);
        if let Operation::Modify { mods, .. } = &mut ctx.operation {
            mods.push(directoryd_store::Modification::Replace("modifiersName".into(), vec![actor]));
            mods.push(directoryd_store::Modification::Replace("entryCSN".into(), vec![self.csn(&stamp)]));
            mods.push(directoryd_store::Modification::Replace("modifyTimestamp".into(), vec![stamp.into_bytes()]));
        }
        next(ctx)
    }

    fn on_rename(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let target = match &ctx.operation {
            Operation::Rename { dn, new_rdn, .. } => renamed_dn(dn, new_rdn),
            _ => None,
        };
        let result = next(ctx)?;
        if let Some(dn) = target {
            self.restamp(ctx, &dn);
        }
        Ok(result)
    }

    fn on_move(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        let target = match &ctx.operation {
            Operation::Move { dn, new_superior } => moved_dn(dn, new_superior),
            _ => None,
        };
        let result = next(ctx)?;
        if let Some(dn) = target {
            self.restamp(ctx, &dn);
        }
        Ok(result)
    }

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        let requested = match &ctx.operation {
            Operation::Search { attributes, .. } => attributes.clone(),
            _ => Vec::new(),
        };
        let mut results = next(ctx)?;
        for (_, entry) in &mut results {
            Self::strip(entry, &requested);
        }
        Ok(results)
    }

    fn on_lookup(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<Entry>) -> Outcome<Entry> {
        let requested = match &ctx.operation {
            Operation::Lookup { attributes, .. } => attributes.clone(),
            _ => Vec::new(),
        };
        let mut entry = next(ctx)?;
        Self::strip(&mut entry, &requested);
        Ok(entry)
    }
}
