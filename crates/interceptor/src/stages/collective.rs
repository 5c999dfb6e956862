use super::prelude::*;

const EXCLUDE_ALL: &str = "excludeAllCollectiveAttributes";

fn excluded_names(entry: &Entry) -> Option<Vec<String>> {
    let values = entry.get("collectiveExclusions")?;
    Some(values.iter().map(|v| String::from_utf8_lossy(v).into_owned()).collect())
}

/// RFC 3671 collective-attribute exclusion: an entry may carry
/// `collectiveExclusions` naming attribute types (or the sentinel
/// `excludeAllCollectiveAttributes`) it opts out of inheriting from its
/// governing subentries. This stage strips any `;collective`-tagged value
/// the [`super::subentry::Subentry`] stage attached that the entry excludes.
pub struct Collective;

impl Collective {
    pub fn new() -> Self {
        Collective
    }

    fn strip_excluded(entry: &mut Entry) {
        let Some(excluded) = excluded_names(entry) else { return };
        let exclude_all = excluded.iter().any(|n| n.eq_ignore_ascii_case(EXCLUDE_ALL));
        entry.attrs.retain(|name, _| {
            let Some(base) = name.strip_suffix(";collective") else { return true };
            if exclude_all {
                return false;
            }
            !excluded.iter().any(|n| n.eq_ignore_ascii_case(base))
        });
    }
}

impl Default for Collective {
    fn default() -> Self {
        Self::new()
    }
}

impl Handlers for Collective {
    fn on_lookup(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<Entry>) -> Outcome<Entry> {
        let mut entry = next(ctx)?;
        Self::strip_excluded(&mut entry);
        Ok(entry)
    }

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        let mut results = next(ctx)?;
        for (_, entry) in &mut results {
            Self::strip_excluded(entry);
        }
        Ok(results)
    }
}
