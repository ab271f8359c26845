//! Interned, optionally namespaced names (e.g. `ns/local` or bare `local`).
use std::cmp::Ordering;
use std::fmt;

/// A name, with an optional namespace component. Printed as `ns/local`
/// when namespaced, or just `local` otherwise.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Name {
    ns: Option<String>,
    local: String,
}

impl Name {
    /// A bare, non-namespaced name. `local` should not contain `/`: the
    /// wire form is the printed `ns/local` string, and [`Name::parse`]
    /// treats the first `/` it finds as the namespace separator.
    pub fn local(local: impl Into<String>) -> Name {
        Name { ns: None, local: local.into() }
    }

    /// A namespaced name. Same `/`-free constraint on `ns` and `local`.
    pub fn namespaced(ns: impl Into<String>, local: impl Into<String>) -> Name {
        Name { ns: Some(ns.into()), local: local.into() }
    }

    /// The namespace component, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// The local (non-namespace) component.
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// The wire-format printed form: `ns/local` or `local`.
    pub fn printed(&self) -> String {
        match &self.ns {
            Some(ns) => format!("{}/{}", ns, self.local),
            None => self.local.clone(),
        }
    }

    /// Parses a printed form back into a `Name`. A single `/` splits
    /// namespace from local; names with no `/` are bare.
    pub fn parse(s: &str) -> Name {
        match s.split_once('/') {
            Some((ns, local)) => Name::namespaced(ns, local),
            None => Name::local(s),
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.printed())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.printed())
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Name) -> Ordering {
        self.printed().cmp(&other.printed())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Name) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_namespaced() {
        let n = Name::parse("user/id");
        assert_eq!(n.namespace(), Some("user"));
        assert_eq!(n.local_name(), "id");
        assert_eq!(n.printed(), "user/id");
    }

    #[test]
    fn parse_roundtrips_bare() {
        let n = Name::parse("id");
        assert_eq!(n.namespace(), None);
        assert_eq!(n.printed(), "id");
    }
}
