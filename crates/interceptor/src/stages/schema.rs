use super::prelude::*;
use directoryd_matching::Syntax;
use directoryd_schema::{AttributeType, ObjectClass, ObjectClassKind, Registry, SchemaObject, Usage};
use std::sync::Arc;

fn syntax_for_oid(oid: &str) -> Option<Syntax> {
    [
        Syntax::DirectoryString,
        Syntax::Ia5String,
        Syntax::NumericString,
        Syntax::Boolean,
        Syntax::Integer,
        Syntax::OctetString,
        Syntax::DistinguishedName,
        Syntax::GeneralizedTime,
        Syntax::Oid,
    ]
    .into_iter()
    .find(|s| s.oid() == oid)
}

/// Validates add/modify against object-class, attribute, and syntax
/// constraints: every structural/auxiliary class named in `objectClass`
/// must be registered, every MUST attribute of each named class must be
/// present, every attribute present must be permitted by some named class
/// (or be an operational attribute), and every value must validate against
/// its attribute's syntax. Also forbids removing every structural class
/// and forbids modifying the RDN-composing value (must go through
/// ModifyDN instead).
pub struct Schema {
    registry: Arc<Registry>,
}

impl Schema {
    pub fn new(registry: Arc<Registry>) -> Self {
        Schema { registry }
    }

    fn object_class(&self, name: &str) -> Option<ObjectClass> {
        let obj = self.registry.lookup_by_name_or_oid(name).ok()?;
        match obj.as_ref() {
            SchemaObject::ObjectClass(oc) => Some(oc.clone()),
            _ => None,
        }
    }

    fn attribute_type(&self, name: &str) -> Option<AttributeType> {
        let obj = self.registry.lookup_by_name_or_oid(name).ok()?;
        match obj.as_ref() {
            SchemaObject::AttributeType(at) => Some(at.clone()),
            _ => None,
        }
    }

    fn validate_entry(&self, entry: &Entry) -> Outcome<()> {
        let classes: Vec<String> =
            entry.object_classes().iter().map(|oc| String::from_utf8_lossy(oc).into_owned()).collect();
        if classes.is_empty() {
            return Err(LdapError::new(LdapResultCode::ObjectClassViolation, "entry has no objectClass"));
        }
        let mut must = std::collections::HashSet::new();
        let mut may = std::collections::HashSet::new();
        let mut has_structural = false;
        for name in &classes {
            let Some(oc) = self.object_class(name) else {
                return Err(LdapError::new(LdapResultCode::ObjectClassViolation, format!("unknown object class {name}")));
            };
            if oc.kind == ObjectClassKind::Structural {
                has_structural = true;
            }
            must.extend(oc.must.iter().cloned());
            may.extend(oc.may.iter().cloned());
        }
        if !has_structural {
            return Err(LdapError::new(LdapResultCode::ObjectClassViolation, "no structural object class"));
        }
        for required in &must {
            if entry.get(required).map(|v| !v.is_empty()).unwrap_or(false) {
                continue;
            }
            return Err(LdapError::new(LdapResultCode::ObjectClassViolation, format!("missing required attribute {required}")));
        }
        for (attr_name, values) in &entry.attrs {
            if attr_name.eq_ignore_ascii_case("objectClass") {
                continue;
            }
            let Some(at) = self.attribute_type(attr_name) else {
                return Err(LdapError::new(LdapResultCode::UndefinedAttributeType, attr_name.clone()));
            };
            if at.usage == Usage::UserApplications
                && !must.iter().any(|m| m.eq_ignore_ascii_case(attr_name))
                && !may.iter().any(|m| m.eq_ignore_ascii_case(attr_name))
            {
                return Err(LdapError::new(
                    LdapResultCode::ObjectClassViolation,
                    format!("attribute {attr_name} not permitted by any named object class"),
                ));
            }
            if let Some(syntax_oid) = &at.syntax {
                if let Some(syntax) = syntax_for_oid(syntax_oid) {
                    for value in values {
                        if !syntax.validate(value) {
                            return Err(LdapError::new(
                                LdapResultCode::InvalidAttributeSyntax,
                                format!("value of {attr_name} fails {syntax_oid} validation"),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Every AVA composing `dn`'s RDN — a multi-valued RDN like
    /// `cn=alice+sn=Apple` protects both components, not just the leading one.
    fn rdn_avas(dn: &directoryd_dn::Dn) -> &[directoryd_dn::Ava] {
        dn.rdn().map(|rdn| rdn.avas()).unwrap_or(&[])
    }

    /// True iff some primitive op in `mods` would remove one of the RDN's
    /// own AVA values — not merely if it touches the RDN attribute's name.
    /// `cn: alice` (RDN) plus `cn: bob` tolerates deleting `bob`; it must
    /// not tolerate deleting `alice`, or replacing `cn` with a set that no
    /// longer contains `alice`.
    fn forbids_rdn_removal(dn: &directoryd_dn::Dn, mods: &[directoryd_store::Modification]) -> bool {
        let rdn_avas = Self::rdn_avas(dn);
        if rdn_avas.is_empty() {
            return false;
        }
        rdn_avas.iter().any(|ava| {
            mods.iter().any(|m| match m {
                directoryd_store::Modification::Delete(name, values) => {
                    name.eq_ignore_ascii_case(&ava.attr) && (values.is_empty() || values.iter().any(|v| v == &ava.value))
                }
                directoryd_store::Modification::Replace(name, values) => {
                    name.eq_ignore_ascii_case(&ava.attr) && !values.iter().any(|v| v == &ava.value)
                }
                directoryd_store::Modification::Add(..) => false,
            })
        })
    }
}

impl Handlers for Schema {
    fn on_add(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<EntryId>) -> Outcome<EntryId> {
        if let Operation::Add { entry, .. } = &ctx.operation {
            self.validate_entry(entry)?;
        }
        next(ctx)
    }

    fn on_modify(&self, ctx: &mut OperationContext, next: &dyn Fn(&mut OperationContext) -> Outcome<()>) -> Outcome<()> {
        if let Operation::Modify { dn, mods } = &ctx.operation {
            if Self::forbids_rdn_removal(dn, mods) {
                return Err(LdapError::new(LdapResultCode::NotAllowedOnRdn, "cannot modify the RDN-composing value; use ModifyDN"));
            }
        }
        next(ctx)
    }
}
