//! Access control of the tree. Pure functions of the principal and the current
//! configuration, recomputed for every request.

use calhome_dav::acltypes::{Ace, Acl, Principal, Privilege};
use calhome_dav::types::Href;
use calhome_directory::config::CalendarConfig;

use super::join_url;

pub const PROXY_READ: &str = "calendar-proxy-read";
pub const PROXY_WRITE: &str = "calendar-proxy-write";

/// ACL of a calendar home owned by the principal at `principal_url`
pub fn home_acl(principal_url: &str, config: &CalendarConfig) -> Acl {
    let owner = Principal::Href(Href(principal_url.to_string()));

    let mut acl = Acl(vec![
        // DAV:read access for authenticated users.
        Ace::grant(
            Principal::Authenticated,
            [Privilege::Read, Privilege::ReadCurrentUserPrivilegeSet],
        ),
        // Inheritable DAV:all access for the home's own principal.
        Ace::grant(owner, [Privilege::All]).protected().inheritable(),
        // Inheritable CALDAV:read-free-busy access for authenticated users.
        Ace::grant(Principal::Authenticated, [Privilege::ReadFreeBusy]).inheritable(),
    ]);

    acl.extend(config.read_aces());
    acl.extend(config.admin_aces());

    if config.enable_proxy_principals {
        acl.extend([
            Ace::grant(proxy(principal_url, PROXY_READ), [Privilege::Read])
                .protected()
                .inheritable(),
            Ace::grant(
                proxy(principal_url, PROXY_WRITE),
                [Privilege::Read, Privilege::Write],
            )
            .protected()
            .inheritable(),
        ]);
    }

    acl
}

/// ACL of the dispatching collections: fixed, not subject to inheritance
pub fn provisioning_acl(config: &CalendarConfig) -> Acl {
    config.provisioning_resource_acl()
}

fn proxy(principal_url: &str, kind: &str) -> Principal {
    Principal::Href(Href(join_url(principal_url, kind)))
}
