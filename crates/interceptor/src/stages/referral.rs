use super::prelude::*;

/// An entry whose `objectClass` includes `referral` holds one or more
/// `ref` URLs. Search/lookup that would return such an entry is rewritten
/// into a referral result unless the request carries `ManageDsaIT`, in
/// which case the entry passes through untouched.
#[derive(Default)]
pub struct Referral;

impl Referral {
    pub fn new() -> Self {
        Referral
    }

    fn is_referral(entry: &Entry) -> bool {
        entry.object_classes().iter().any(|oc| oc.eq_ignore_ascii_case(b"referral"))
    }

    fn referral_urls(entry: &Entry) -> Vec<String> {
        entry.get("ref").map(|vs| vs.iter().map(|v| String::from_utf8_lossy(v).into_owned()).collect()).unwrap_or_default()
    }
}

impl Handlers for Referral {
    fn on_lookup(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<Entry>) -> Outcome<Entry> {
        let manage_dsa_it = ctx.manage_dsa_it;
        let entry = next(ctx)?;
        if !manage_dsa_it && Self::is_referral(&entry) {
            ctx.controls.referral_urls = Self::referral_urls(&entry);
        }
        Ok(entry)
    }

    fn on_search(
        &self,
        ctx: &mut OperationContext,
        next: &dyn Fn(&mut OperationContext) -> Outcome<Vec<(EntryId, Entry)>>,
    ) -> Outcome<Vec<(EntryId, Entry)>> {
        let manage_dsa_it = ctx.manage_dsa_it;
        let results = next(ctx)?;
        if manage_dsa_it {
            return Ok(results);
        }
        let mut urls = Vec::new();
        let mut passthrough = Vec::new();
        for (id, entry) in results {
            if Self::is_referral(&entry) {
                urls.extend(Self::referral_urls(&entry));
            } else {
                passthrough.push((id, entry));
            }
        }
        ctx.controls.referral_urls = urls;
        Ok(passthrough)
    }
}
