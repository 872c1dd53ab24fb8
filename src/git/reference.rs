use super::hash::Hash;
use super::iter::Series;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static SHOW_REF_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9a-f]{40}) ([\w/.-]+)").expect("valid show-ref regex"));

const BRANCH_PREFIX: &str = "refs/heads/";

/// Iterator over references
pub type ReferenceIter = Series<Reference>;

/// Kind of reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceType {
    #[default]
    Invalid,
    /// Points directly at an object hash
    Hash,
    /// Points at another reference
    Symbolic,
}

/// Fully qualified name of a reference, e.g. `refs/heads/main`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ReferenceName(String);

impl ReferenceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn head() -> Self {
        Self::new("HEAD")
    }

    pub fn master() -> Self {
        Self::new("refs/heads/master")
    }

    pub fn main() -> Self {
        Self::new("refs/heads/main")
    }

    pub fn origin_master() -> Self {
        Self::new("refs/remotes/origin/master")
    }

    /// `"main"` becomes `refs/heads/main`
    pub fn branch(name: &str) -> Self {
        Self(format!("{BRANCH_PREFIX}{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_branch(&self) -> bool {
        self.0.starts_with(BRANCH_PREFIX)
    }

    /// Branch name without the `refs/heads/` prefix; other names unchanged
    pub fn short(&self) -> &str {
        self.0.strip_prefix(BRANCH_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ReferenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReferenceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A git reference
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reference {
    kind: ReferenceType,
    name: ReferenceName,
    hash: Hash,
    target: Option<ReferenceName>,
}

impl Reference {
    pub fn new_hash_reference(name: ReferenceName, hash: Hash) -> Self {
        Self {
            kind: ReferenceType::Hash,
            name,
            hash,
            target: None,
        }
    }

    pub fn new_symbolic_reference(name: ReferenceName, target: ReferenceName) -> Self {
        Self {
            kind: ReferenceType::Symbolic,
            name,
            hash: Hash::default(),
            target: Some(target),
        }
    }

    pub fn kind(&self) -> ReferenceType {
        self.kind
    }

    pub fn name(&self) -> &ReferenceName {
        &self.name
    }

    /// Hash of a hash reference; zero for symbolic references
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn target(&self) -> Option<&ReferenceName> {
        self.target.as_ref()
    }
}

/// Parse `git show-ref` output into hash references
pub(crate) fn parse_show_ref(output: &str) -> Vec<Reference> {
    SHOW_REF_LINE
        .captures_iter(output)
        .filter_map(|caps| {
            let hash = Hash::from_hex(&caps[1]).ok()?;
            Some(Reference::new_hash_reference(
                ReferenceName::new(&caps[2]),
                hash,
            ))
        })
        .collect()
}
