use crate::tuple::MicroOperation;
use directoryd_auth::Principal;
use directoryd_dn::Dn;
use directoryd_store::EntryId;

/// The specific item an operation is being checked against — finer-grained
/// than [`crate::tuple::ProtectedItem`], which describes what a *tuple*
/// covers; this is what a particular *request* touches.
#[derive(Debug, Clone)]
pub enum Item {
    Entry,
    Attribute(String),
    AttributeValue(String, Vec<u8>),
}

/// One access check: "can `requester` perform `operation` on `item` of the
/// entry at `target`?"
#[derive(Debug, Clone)]
pub struct Request {
    pub requester: Principal,
    pub target_dn: Dn,
    pub target_id: EntryId,
    pub parent_dn: Option<Dn>,
    pub operation: MicroOperation,
    pub item: Item,
}
