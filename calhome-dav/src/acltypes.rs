use serde::{Deserialize, Serialize};

use super::types as dav;

//RFC covered: RFC3744 (ACL core), RFC4791 section 6.1.1 (CALDAV:read-free-busy)
//plus the "inheritable" flag of the Twisted DAV server.

/// Who an ACE applies to
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Principal {
    All,
    Authenticated,
    Unauthenticated,
    Href(dav::Href),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Privilege {
    All,
    Read,
    Write,
    ReadCurrentUserPrivilegeSet,
    /// CALDAV:read-free-busy
    ReadFreeBusy,
}

/// An access control entry. Only grants are modelled, this server never denies.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Ace {
    pub principal: Principal,
    pub grant: Vec<Privilege>,
    /// Can't be removed or weakened by a later ACL write
    #[serde(default)]
    pub protected: bool,
    /// Propagated as-is to every descendant resource
    #[serde(default)]
    pub inheritable: bool,
}

impl Ace {
    pub fn grant(principal: Principal, grant: impl IntoIterator<Item = Privilege>) -> Self {
        Self {
            principal,
            grant: grant.into_iter().collect(),
            protected: false,
            inheritable: false,
        }
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn inheritable(mut self) -> Self {
        self.inheritable = true;
        self
    }

    pub fn grants(&self, privilege: Privilege) -> bool {
        self.grant.contains(&privilege)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl(pub Vec<Ace>);

impl Acl {
    pub fn iter(&self) -> std::slice::Iter<'_, Ace> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The entries a child resource receives from this ACL
    pub fn inherited(&self) -> Acl {
        Acl(self.0.iter().filter(|ace| ace.inheritable).cloned().collect())
    }
}

impl FromIterator<Ace> for Acl {
    fn from_iter<I: IntoIterator<Item = Ace>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Ace> for Acl {
    fn extend<I: IntoIterator<Item = Ace>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl<'a> IntoIterator for &'a Acl {
    type Item = &'a Ace;
    type IntoIter = std::slice::Iter<'a, Ace>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inherited_keeps_only_inheritable_entries() {
        let acl = Acl(vec![
            Ace::grant(Principal::Authenticated, [Privilege::Read]),
            Ace::grant(Principal::Href("/principals/__uids__/abc/".into()), [Privilege::All])
                .protected()
                .inheritable(),
        ]);

        let inherited = acl.inherited();
        assert_eq!(inherited.len(), 1);
        assert!(inherited.0[0].grants(Privilege::All));
        assert!(inherited.0[0].protected);
    }

    #[test]
    fn ace_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            aces: Vec<Ace>,
        }

        let src = r#"
[[aces]]
principal = "authenticated"
grant = ["read", "read-current-user-privilege-set"]

[[aces]]
principal = { href = "/principals/__uids__/admin/" }
grant = ["all"]
protected = true
inheritable = true
"#;
        let holder: Holder = toml::from_str(src).unwrap();
        assert_eq!(holder.aces.len(), 2);
        assert_eq!(holder.aces[0].principal, Principal::Authenticated);
        assert!(!holder.aces[0].protected);
        assert_eq!(
            holder.aces[1].principal,
            Principal::Href("/principals/__uids__/admin/".into())
        );
        assert!(holder.aces[1].protected && holder.aces[1].inheritable);
    }
}
