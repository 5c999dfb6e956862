use crate::error::Result;
use crate::request::{Item, Request};
use crate::tuple::{AciTuple, MicroOperation, ProtectedItem, SubtreeSpec, UserClass};
use directoryd_dn::{AsciiLowerNormalizer, Dn};
use directoryd_filter::Evaluator;
use directoryd_store::{Entry, StoreBackend};
use crepe::crepe;
use std::sync::Arc;

/// What a tuple or request's item resolves to for the Datalog join: entry
/// level or a specific attribute name. `RangeOfValues`/`AttributeValue`
/// refinement against an actual value is resolved in Rust before facts are
/// asserted (see [`item_matches`]), since it needs filter evaluation the
/// join itself can't perform.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ItemKey {
    Entry,
    Attribute(String),
}

impl ItemKey {
    fn for_request_item(item: &Item) -> Self {
        match item {
            Item::Entry => ItemKey::Entry,
            Item::Attribute(name) | Item::AttributeValue(name, _) => ItemKey::Attribute(name.to_ascii_lowercase()),
        }
    }
}

crepe! {
    @input
    struct Tuple(usize, i32, bool);
    @input
    struct TupleOp(usize, MicroOperation);
    @input
    struct TupleItem(usize, ItemKey);
    @input
    struct UserMatches(usize);
    @input
    struct LevelOk(usize);
    @input
    struct RequestedOp(MicroOperation);
    @input
    struct RequestedItem(ItemKey);

    struct Applicable(i32, bool);

    @output
    struct Decision(i32, bool);

    Applicable(p, g) <- Tuple(i, p, g), UserMatches(i), LevelOk(i),
        TupleOp(i, op), RequestedOp(op),
        TupleItem(i, item), RequestedItem(item);

    Decision(p, g) <- Applicable(p, g);
}

/// Resolves a user class against a request, consulting the store for group
/// membership and subtree containment. Not expressed in Datalog: group
/// membership and subtree depth/refinement checks need store lookups and
/// filter evaluation that a plain-fact join can't perform.
fn user_matches(classes: &[UserClass], req: &Request, store: &dyn StoreBackend, filter_eval: &Evaluator) -> Result<bool> {
    let norm = AsciiLowerNormalizer;
    for class in classes {
        let matched = match class {
            UserClass::AllUsers => true,
            UserClass::ThisEntry => req.requester.dn.as_ref().is_some_and(|dn| dn.equals(&req.target_dn, &norm)),
            UserClass::ParentOfEntry => match (&req.requester.dn, &req.parent_dn) {
                (Some(dn), Some(parent)) => dn.equals(parent, &norm),
                _ => false,
            },
            UserClass::Name(dns) => req
                .requester
                .dn
                .as_ref()
                .is_some_and(|dn| dns.iter().any(|n| n.equals(dn, &norm))),
            UserClass::UserGroup(groups) => match &req.requester.dn {
                Some(dn) => group_contains(groups, dn, store)?,
                None => false,
            },
            UserClass::Subtree(spec) => subtree_contains(spec, req, store, filter_eval)?,
        };
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}

fn group_contains(groups: &[Dn], member: &Dn, store: &dyn StoreBackend) -> Result<bool> {
    let norm = AsciiLowerNormalizer;
    for group_dn in groups {
        let Ok((_, group_entry)) = store.lookup(group_dn) else { continue };
        let members = group_entry
            .get("member")
            .or_else(|| group_entry.get("uniqueMember"))
            .cloned()
            .unwrap_or_default();
        for m in &members {
            if let Ok(parsed) = directoryd_dn::parse(&String::from_utf8_lossy(m)) {
                if parsed.equals(member, &norm) {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

fn subtree_contains(spec: &SubtreeSpec, req: &Request, store: &dyn StoreBackend, filter_eval: &Evaluator) -> Result<bool> {
    let norm = AsciiLowerNormalizer;
    let Some(requester) = &req.requester.dn else { return Ok(false) };
    if !spec.base.ancestor_of(requester, &norm) {
        return Ok(false);
    }
    if spec.exclusions.iter().any(|ex| ex.ancestor_of(requester, &norm)) {
        return Ok(false);
    }
    let depth = requester.rdns().len() - spec.base.rdns().len();
    if let Some(min) = spec.min_depth {
        if (depth as u32) < min {
            return Ok(false);
        }
    }
    if let Some(max) = spec.max_depth {
        if (depth as u32) > max {
            return Ok(false);
        }
    }
    if let Some(filter) = &spec.refinement {
        let Ok((_, entry)) = store.lookup(requester) else { return Ok(false) };
        if !filter_eval.matches(filter, &entry)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether a tuple's protected items cover the requested item, and emits
/// the `ItemKey` the tuple matched under (so the Datalog join can line it
/// up against the request's own key).
fn item_matches(items: &[ProtectedItem], req_item: &Item, filter_eval: &Evaluator, target: &Entry) -> Result<Option<ItemKey>> {
    for item in items {
        let matched = match (item, req_item) {
            (ProtectedItem::Entry, Item::Entry) => Some(ItemKey::Entry),
            (ProtectedItem::AllAttributeValues(names), Item::Attribute(name))
            | (ProtectedItem::AttributeType(names), Item::Attribute(name)) => {
                names.iter().any(|n| n.eq_ignore_ascii_case(name)).then(|| ItemKey::Attribute(name.to_ascii_lowercase()))
            }
            (ProtectedItem::AllAttributeValues(names), Item::AttributeValue(name, _))
            | (ProtectedItem::AttributeType(names), Item::AttributeValue(name, _)) => {
                names.iter().any(|n| n.eq_ignore_ascii_case(name)).then(|| ItemKey::Attribute(name.to_ascii_lowercase()))
            }
            (ProtectedItem::RangeOfValues(filter), Item::AttributeValue(name, _)) => {
                filter_eval.matches(filter, target)?.then(|| ItemKey::Attribute(name.to_ascii_lowercase()))
            }
            _ => None,
        };
        if matched.is_some() {
            return Ok(matched);
        }
    }
    Ok(None)
}

/// Evaluates a set of ACI tuples against one access request. Per RFC
/// 2829/RFC 4523: denies override grants at equal precedence, higher
/// precedence overrides lower, and absence of any matching grant denies.
pub struct Engine {
    tuples: Vec<AciTuple>,
}

impl Engine {
    pub fn new(tuples: Vec<AciTuple>) -> Self {
        Engine { tuples }
    }

    pub fn evaluate(&self, req: &Request, store: &Arc<dyn StoreBackend>, filter_eval: &Evaluator) -> Result<bool> {
        let target_entry = store.lookup_by_id(req.target_id)?;
        let requested_key = ItemKey::for_request_item(&req.item);

        let mut runtime = Crepe::new();

        for (i, tuple) in self.tuples.iter().enumerate() {
            let Some(matched_key) = item_matches(&tuple.protected_items, &req.item, filter_eval, &target_entry)? else {
                continue;
            };
            runtime.extend([Tuple(i, tuple.precedence, tuple.grant)]);
            runtime.extend(tuple.operations.iter().map(|op| TupleOp(i, *op)));
            runtime.extend([TupleItem(i, matched_key)]);
            if user_matches(&tuple.user_classes, req, store.as_ref(), filter_eval)? {
                runtime.extend([UserMatches(i)]);
            }
            if req.requester.level >= tuple.auth_level {
                runtime.extend([LevelOk(i)]);
            }
        }
        runtime.extend([RequestedOp(req.operation)]);
        runtime.extend([RequestedItem(requested_key)]);

        let (decisions,) = runtime.run();
        Ok(resolve(decisions))
    }
}

fn resolve(decisions: std::collections::HashSet<Decision>) -> bool {
    let Some(top) = decisions.iter().map(|d| d.0).max() else { return false };
    let at_top: Vec<bool> = decisions.iter().filter(|d| d.0 == top).map(|d| d.1).collect();
    if at_top.iter().any(|g| !*g) {
        false
    } else {
        at_top.iter().any(|g| *g)
    }
}
