//! Route access decisions.
//!
//! [`evaluate`] is a pure function of the route's requirement, the
//! visitor's current [`AuthSnapshot`] and the request path. The axum layer
//! in [`crate::middleware::guard`] maps the decision onto HTML or JSON
//! responses; nothing here is cached between requests.

use crate::auth::AuthSnapshot;

/// What a route asks of the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequirement {
    pub require_auth: bool,
    pub require_admin: bool,
}

impl RouteRequirement {
    /// Anyone; signed-in visitors are sent away from auth-only pages.
    pub const PUBLIC: Self = Self {
        require_auth: false,
        require_admin: false,
    };

    pub const SIGNED_IN: Self = Self {
        require_auth: true,
        require_admin: false,
    };

    pub const ADMIN: Self = Self {
        require_auth: true,
        require_admin: true,
    };

    /// The storefront's route table.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        if under(path, "/admin") || under(path, "/api/admin") {
            Self::ADMIN
        } else if under(path, "/settings") {
            Self::SIGNED_IN
        } else {
            Self::PUBLIC
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth state has not settled; show a placeholder and check again.
    Loading,
    Granted,
    /// Send the visitor to sign in, then back to `return_to`.
    RedirectToAuth { return_to: String },
    RedirectHome,
}

/// Decide whether the visitor may see `path`.
#[must_use]
pub fn evaluate(
    requirement: RouteRequirement,
    snapshot: &AuthSnapshot,
    path: &str,
) -> GuardDecision {
    if snapshot.loading {
        return GuardDecision::Loading;
    }
    if requirement.require_auth && snapshot.user.is_none() {
        return GuardDecision::RedirectToAuth {
            return_to: path.to_owned(),
        };
    }
    if requirement.require_admin && (snapshot.user.is_none() || !snapshot.is_admin()) {
        return GuardDecision::RedirectHome;
    }
    if !requirement.require_auth && snapshot.user.is_some() && is_auth_only(path) {
        return GuardDecision::RedirectHome;
    }
    GuardDecision::Granted
}

/// Pages only signed-out visitors need (`/auth` and below).
#[must_use]
pub fn is_auth_only(path: &str) -> bool {
    under(path, "/auth")
}

/// `path` is `prefix` or a sub-path of it.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Where to send a visitor after signing in.
///
/// Only same-site paths are honoured; anything else goes home.
#[must_use]
pub fn safe_return_path(requested: Option<&str>) -> &str {
    match requested {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use nullbyte_core::Role;

    use super::*;
    use crate::testing::{profile_for, session_for, user};

    fn settled(role: Option<Role>, signed_in: bool) -> AuthSnapshot {
        let mut snapshot = AuthSnapshot::default();
        if signed_in {
            let ada = user("ada@example.com");
            snapshot.session = Some(session_for(&ada, "t1"));
            snapshot.profile = role.map(|r| profile_for(&ada, r));
            snapshot.user = Some(ada);
        }
        snapshot
    }

    fn loading() -> AuthSnapshot {
        AuthSnapshot {
            loading: true,
            ..AuthSnapshot::default()
        }
    }

    #[test]
    fn test_loading_wins_over_everything() {
        for requirement in [RouteRequirement::PUBLIC, RouteRequirement::SIGNED_IN, RouteRequirement::ADMIN] {
            assert_eq!(evaluate(requirement, &loading(), "/admin"), GuardDecision::Loading);
        }
    }

    #[test]
    fn test_anonymous_visitor_is_sent_to_sign_in() {
        let decision = evaluate(RouteRequirement::SIGNED_IN, &settled(None, false), "/settings");
        assert_eq!(
            decision,
            GuardDecision::RedirectToAuth {
                return_to: "/settings".to_owned()
            }
        );
        assert!(matches!(
            evaluate(RouteRequirement::ADMIN, &settled(None, false), "/admin"),
            GuardDecision::RedirectToAuth { .. }
        ));
    }

    #[test]
    fn test_admin_route_never_grants_non_admin() {
        let snapshots = [
            loading(),
            settled(None, false),
            settled(None, true),
            settled(Some(Role::User), true),
        ];
        for snapshot in &snapshots {
            assert_ne!(
                evaluate(RouteRequirement::ADMIN, snapshot, "/admin/products"),
                GuardDecision::Granted
            );
        }
        assert_eq!(
            evaluate(RouteRequirement::ADMIN, &settled(Some(Role::User), true), "/admin"),
            GuardDecision::RedirectHome
        );
    }

    #[test]
    fn test_admin_is_granted() {
        let admin = settled(Some(Role::Admin), true);
        assert_eq!(
            evaluate(RouteRequirement::ADMIN, &admin, "/admin"),
            GuardDecision::Granted
        );
    }

    #[test]
    fn test_signed_in_visitor_leaves_auth_pages_only() {
        let visitor = settled(Some(Role::User), true);
        assert_eq!(
            evaluate(RouteRequirement::PUBLIC, &visitor, "/auth"),
            GuardDecision::RedirectHome
        );
        assert_eq!(
            evaluate(RouteRequirement::PUBLIC, &visitor, "/auth/sign-up"),
            GuardDecision::RedirectHome
        );
        for path in ["/", "/products", "/reset-password", "/authors"] {
            assert_eq!(
                evaluate(RouteRequirement::PUBLIC, &visitor, path),
                GuardDecision::Granted,
                "{path}"
            );
        }
    }

    #[test]
    fn test_anonymous_visitor_may_use_auth_pages() {
        assert_eq!(
            evaluate(RouteRequirement::PUBLIC, &settled(None, false), "/auth"),
            GuardDecision::Granted
        );
    }

    #[test]
    fn test_route_table() {
        assert_eq!(RouteRequirement::for_path("/admin"), RouteRequirement::ADMIN);
        assert_eq!(RouteRequirement::for_path("/admin/orders"), RouteRequirement::ADMIN);
        assert_eq!(RouteRequirement::for_path("/api/admin/stats"), RouteRequirement::ADMIN);
        assert_eq!(RouteRequirement::for_path("/settings"), RouteRequirement::SIGNED_IN);
        assert_eq!(RouteRequirement::for_path("/administrator"), RouteRequirement::PUBLIC);
        assert_eq!(RouteRequirement::for_path("/auth"), RouteRequirement::PUBLIC);
        assert_eq!(RouteRequirement::for_path("/products/abc"), RouteRequirement::PUBLIC);
    }

    #[test]
    fn test_safe_return_path() {
        assert_eq!(safe_return_path(Some("/admin/orders")), "/admin/orders");
        assert_eq!(safe_return_path(Some("//evil.example.com")), "/");
        assert_eq!(safe_return_path(Some("https://evil.example.com")), "/");
        assert_eq!(safe_return_path(None), "/");
    }
}
