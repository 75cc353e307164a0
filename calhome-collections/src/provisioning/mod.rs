pub mod acl;
pub mod home;
pub mod root;
pub mod type_node;
pub mod uid_node;

use std::sync::{Arc, Weak};

use tokio::sync::watch;

use calhome_dav::acltypes::Acl;
use calhome_directory::config::CalendarConfig;

use crate::error::{ProvisioningError, Result};

pub use home::{CalendarHome, HomeChild};
pub use root::HomeProvisioningRoot;
pub use type_node::{ShortNames, TypeProvisioningNode};
pub use uid_node::UidProvisioningNode;

// Use __underbars__ convention to avoid conflicts with directory record types.
pub const UIDS_RESOURCE_NAME: &str = "__uids__";

/// The live configuration. Every borrow sees the latest reload.
pub type ConfigHandle = watch::Receiver<CalendarConfig>;

/// Join a collection URL and a segment into a collection URL (trailing '/')
pub fn join_url(base: &str, segment: &str) -> String {
    format!(
        "{}/{}/",
        base.trim_end_matches('/'),
        segment.trim_matches('/')
    )
}

/// A node of the calendar home tree: it resolves its named children,
/// materializing them on first access, and knows its own access control.
pub trait ProvisioningNode {
    /// Canonical URL, always ending with a '/'
    fn url(&self) -> &str;

    /// Resolve one path segment below this node
    fn resolve_child(&self, name: &str) -> Result<Node>;

    /// Names of the children. Fails with `Forbidden` on non-listable nodes,
    /// which is not the same thing as having no children.
    fn list_children(&self) -> Result<Vec<String>>;

    /// Freshly computed on each call, never cached
    fn access_control_list(&self) -> Acl;

    /// Every node of this tree is a collection
    fn is_collection(&self) -> bool {
        true
    }
}

/// Any node of the tree, as handed out to the protocol layer
#[derive(Clone)]
pub enum Node {
    Root(Arc<HomeProvisioningRoot>),
    RecordType(Arc<TypeProvisioningNode>),
    Uids(Arc<UidProvisioningNode>),
    Home(Arc<CalendarHome>),
    HomeChild(HomeChild),
}

impl Node {
    fn inner(&self) -> &dyn ProvisioningNode {
        match self {
            Self::Root(n) => n.as_ref(),
            Self::RecordType(n) => n.as_ref(),
            Self::Uids(n) => n.as_ref(),
            Self::Home(n) => n.as_ref(),
            Self::HomeChild(n) => n,
        }
    }

    /// Walk down a relative path, one segment at a time
    pub fn walk(&self, path: &str) -> Result<Node> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.clone(), |node, segment| node.resolve_child(segment))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Root(_) => "calendar home provisioning root",
            Self::RecordType(_) => "record type provisioning collection",
            Self::Uids(_) => "uid provisioning collection",
            Self::Home(_) => "calendar home",
            Self::HomeChild(_) => "calendar home child",
        }
    }

    pub fn as_home(&self) -> Option<&Arc<CalendarHome>> {
        match self {
            Self::Home(home) => Some(home),
            _ => None,
        }
    }
}

impl ProvisioningNode for Node {
    fn url(&self) -> &str {
        self.inner().url()
    }

    fn resolve_child(&self, name: &str) -> Result<Node> {
        if name.is_empty() {
            return Ok(self.clone());
        }
        self.inner().resolve_child(name)
    }

    fn list_children(&self) -> Result<Vec<String>> {
        self.inner().list_children()
    }

    fn access_control_list(&self) -> Acl {
        self.inner().access_control_list()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind())
            .field("url", &self.url())
            .finish()
    }
}

/// A node handing out itself, through the weak handle it keeps on itself
pub(crate) fn upgrade<T>(me: &Weak<T>, url: &str) -> Result<Arc<T>> {
    me.upgrade().ok_or_else(|| {
        ProvisioningError::Configuration(format!("{} is not owned by its tree", url))
    })
}

pub(crate) fn not_found(parent_url: &str, name: &str) -> ProvisioningError {
    ProvisioningError::NotFound(format!("{}{}", parent_url, name))
}
