/// The three structural kinds an object class may declare, per RFC 4512 §2.4.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjectClassKind {
    Structural,
    Auxiliary,
    Abstract,
}

/// How an attribute type's values participate in replication and directory
/// operations, per RFC 4512 §2.5.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Usage {
    UserApplications,
    DirectoryOperation,
    DistributedOperation,
    DsaOperation,
}

impl Default for Usage {
    fn default() -> Self {
        Usage::UserApplications
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeType {
    pub oid: String,
    pub names: Vec<String>,
    pub desc: Option<String>,
    pub obsolete: bool,
    pub sup: Option<String>,
    pub equality: Option<String>,
    pub ordering: Option<String>,
    pub substr: Option<String>,
    pub syntax: Option<String>,
    pub single_value: bool,
    pub collective: bool,
    pub no_user_modification: bool,
    pub usage: Usage,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ObjectClass {
    pub oid: String,
    pub names: Vec<String>,
    pub desc: Option<String>,
    pub obsolete: bool,
    pub sup: Vec<String>,
    pub kind: ObjectClassKind,
    pub must: Vec<String>,
    pub may: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchingRule {
    pub oid: String,
    pub names: Vec<String>,
    pub desc: Option<String>,
    pub syntax: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LdapSyntax {
    pub oid: String,
    pub desc: Option<String>,
}

/// The union of schema object kinds a registry can hold, so `register`/
/// `lookup_by_name_or_oid` can operate uniformly over all four.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SchemaObject {
    AttributeType(AttributeType),
    ObjectClass(ObjectClass),
    MatchingRule(MatchingRule),
    Syntax(LdapSyntax),
}

impl SchemaObject {
    pub fn oid(&self) -> &str {
        match self {
            SchemaObject::AttributeType(a) => &a.oid,
            SchemaObject::ObjectClass(o) => &o.oid,
            SchemaObject::MatchingRule(m) => &m.oid,
            SchemaObject::Syntax(s) => &s.oid,
        }
    }

    pub fn names(&self) -> &[String] {
        match self {
            SchemaObject::AttributeType(a) => &a.names,
            SchemaObject::ObjectClass(o) => &o.names,
            SchemaObject::MatchingRule(m) => &m.names,
            SchemaObject::Syntax(_) => &[],
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            SchemaObject::AttributeType(_) => "attributeType",
            SchemaObject::ObjectClass(_) => "objectClass",
            SchemaObject::MatchingRule(_) => "matchingRule",
            SchemaObject::Syntax(_) => "ldapSyntax",
        }
    }
}
