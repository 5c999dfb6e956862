use super::prelude::*;
use directoryd_dn::{render_ldif, ChangeRecord, Mod};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

fn to_ldif_mods(mods: &[directoryd_store::Modification]) -> Vec<Mod> {
    mods.iter()
        .map(|m| match m {
            directoryd_store::Modification::Add(name, values) => Mod::Add(name.clone(), values.clone()),
            directoryd_store::Modification::Delete(name, values) => Mod::Delete(name.clone(), values.clone()),
            directoryd_store::Modification::Replace(name, values) => Mod::Replace(name.clone(), values.clone()),
        })
        .collect()
}

/// Appends every committed write as an RFC 2849 LDIF change record to a
/// changelog file, reusing the entry-change codec the `dn` crate already
/// implements for change reversal. An optional sink, not a replication
/// mechanism: nothing in this crate ever reads the file back.
pub struct Changelog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Changelog {
    pub fn new(path: PathBuf) -> Self {
        Changelog { path, lock: Mutex::new(()) }
    }

    fn append(&self, record: ChangeRecord) {
        let bytes = render_ldif(&record, 0);
        let _guard = self.lock.lock();
        let file = OpenOptions::new().create(true).append(true).open(&self.path);
        match file {
            Ok(mut f) => {
                if let Err(e) = f.write_all(&bytes).and_then(|_| f.write_all(b"\n")) {
                    tracing::warn!(error = %e, path = %self.path.display(), "failed to append changelog record");
                }
            }
            Err(e) => tracing::warn!(error = %e, path = %self.path.display(), "failed to open changelog file"),
        }
    }
}

impl Handlers for Changelog {
    fn on_add(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>) -> Outcome<EntryId> {
        let id = next(ctx)?;
        if let Operation::Add { dn, entry } = &ctx.operation {
            self.append(ChangeRecord::Add { dn: dn.clone(), attrs: entry.attrs.clone() });
        }
        Ok(id)
    }

    fn on_delete(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)?;
        if let Operation::Delete { dn } = &ctx.operation {
            self.append(ChangeRecord::Delete { dn: dn.clone() });
        }
        Ok(())
    }

    fn on_modify(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)?;
        if let Operation::Modify { dn, mods } = &ctx.operation {
            self.append(ChangeRecord::Modify { dn: dn.clone(), mods: to_ldif_mods(mods) });
        }
        Ok(())
    }

    fn on_rename(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)?;
        if let Operation::Rename { dn, new_rdn, delete_old_rdn } = &ctx.operation {
            self.append(ChangeRecord::ModifyDn {
                dn: dn.clone(),
                new_rdn: new_rdn.clone(),
                delete_old_rdn: *delete_old_rdn,
                new_superior: None,
            });
        }
        Ok(())
    }

    fn on_move(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        next(ctx)?;
        if let Operation::Move { dn, new_superior } = &ctx.operation {
            let new_rdn = dn.rdn().map(|r| r.to_string()).unwrap_or_default();
            self.append(ChangeRecord::ModifyDn {
                dn: dn.clone(),
                new_rdn,
                delete_old_rdn: false,
                new_superior: Some(new_superior.clone()),
            });
        }
        Ok(())
    }
}
