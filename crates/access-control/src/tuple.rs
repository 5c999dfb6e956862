use directoryd_auth::AuthenticationLevel;
use directoryd_dn::Dn;
use directoryd_filter::Filter;

/// Which requesters a tuple applies to.
#[derive(Debug, Clone)]
pub enum UserClass {
    AllUsers,
    /// The requester is the entry being accessed.
    ThisEntry,
    /// The requester is the immediate superior of the entry being accessed.
    ParentOfEntry,
    Name(Vec<Dn>),
    /// Each DN names a group entry; membership is resolved against its
    /// `member`/`uniqueMember` values.
    UserGroup(Vec<Dn>),
    Subtree(SubtreeSpec),
}

/// A subtree specification: a base plus exclusions, a depth window, and an
/// optional refinement filter — RFC 3672 shape, generalized to an RFC 4511
/// filter for the refinement rather than an object-class refinement grammar.
#[derive(Debug, Clone)]
pub struct SubtreeSpec {
    pub base: Dn,
    pub exclusions: Vec<Dn>,
    pub min_depth: Option<u32>,
    pub max_depth: Option<u32>,
    pub refinement: Option<Filter>,
}

/// What a tuple protects.
#[derive(Debug, Clone)]
pub enum ProtectedItem {
    Entry,
    AllAttributeValues(Vec<String>),
    AttributeType(Vec<String>),
    RangeOfValues(Filter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicroOperation {
    Read,
    Add,
    Remove,
    Modify,
    Compare,
    Search,
    FilterMatch,
    Rename,
    ExportEntry,
    ImportEntry,
    ReturnDn,
    BrowseEntry,
    Disclose,
}

/// One ACI tuple: a precondition (user class, authentication level), a
/// scope (protected items, micro-operations), a grant/deny boolean, and a
/// precedence used to break ties between tuples that both apply.
#[derive(Debug, Clone)]
pub struct AciTuple {
    pub precedence: i32,
    pub user_classes: Vec<UserClass>,
    pub auth_level: AuthenticationLevel,
    pub protected_items: Vec<ProtectedItem>,
    pub operations: Vec<MicroOperation>,
    pub grant: bool,
}
