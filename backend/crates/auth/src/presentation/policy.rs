//! Route Access Policy
//!
//! Declarative table mapping request method + path to an access level.
//! Rules are evaluated in declaration order; the first match wins and
//! unmatched requests fall back to the policy default. A safe policy keeps
//! the default at [`Access::Authenticated`] and opens routes explicitly.

use axum::http::Method;

use crate::domain::value_object::role::Role;

/// Access level required for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No authentication required
    Public,
    /// Any authenticated identity
    Authenticated,
    /// Authenticated identity holding the given role
    Role(Role),
}

/// One ordered policy rule
#[derive(Debug, Clone)]
pub struct RouteRule {
    method: Option<Method>,
    pattern: String,
    access: Access,
}

impl RouteRule {
    /// Rule matching any method on `pattern`.
    ///
    /// Patterns are exact paths, or prefixes ending in `*`: `/admin/*`
    /// matches `/admin` and everything below it, `/courses*` also matches
    /// `/courses-export`.
    pub fn new(pattern: impl Into<String>, access: Access) -> Self {
        Self {
            method: None,
            pattern: pattern.into(),
            access,
        }
    }

    /// Restrict the rule to one HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        if let Some(m) = &self.method {
            if m != method {
                return false;
            }
        }
        pattern_matches(&self.pattern, path)
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix("/*") {
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        path.starts_with(prefix)
    } else {
        path == pattern
    }
}

/// Ordered first-match route policy
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: Vec<RouteRule>,
    default_access: Access,
}

impl RoutePolicy {
    pub fn new(default_access: Access) -> Self {
        Self {
            rules: Vec::new(),
            default_access,
        }
    }

    /// Append a rule; earlier rules take precedence.
    pub fn rule(mut self, rule: RouteRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Resolve the access level for a request.
    pub fn access_for(&self, method: &Method, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.access)
            .unwrap_or(self.default_access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RoutePolicy {
        RoutePolicy::new(Access::Authenticated)
            .rule(RouteRule::new("/authenticate", Access::Public).with_method(Method::POST))
            .rule(RouteRule::new("/courses*", Access::Public).with_method(Method::GET))
            .rule(RouteRule::new("/admin/*", Access::Role(Role::Admin)))
            .rule(RouteRule::new("/", Access::Public))
    }

    #[test]
    fn test_first_match_wins() {
        let p = RoutePolicy::new(Access::Authenticated)
            .rule(RouteRule::new("/admin/health", Access::Public))
            .rule(RouteRule::new("/admin/*", Access::Role(Role::Admin)));

        assert_eq!(p.access_for(&Method::GET, "/admin/health"), Access::Public);
        assert_eq!(
            p.access_for(&Method::GET, "/admin/users"),
            Access::Role(Role::Admin)
        );
    }

    #[test]
    fn test_method_filter() {
        let p = policy();
        assert_eq!(p.access_for(&Method::POST, "/authenticate"), Access::Public);
        assert_eq!(
            p.access_for(&Method::GET, "/authenticate"),
            Access::Authenticated
        );
        assert_eq!(p.access_for(&Method::GET, "/courses/42"), Access::Public);
        assert_eq!(
            p.access_for(&Method::DELETE, "/courses/42"),
            Access::Authenticated
        );
    }

    #[test]
    fn test_prefix_wildcards() {
        let p = policy();
        assert_eq!(
            p.access_for(&Method::GET, "/admin"),
            Access::Role(Role::Admin)
        );
        assert_eq!(
            p.access_for(&Method::POST, "/admin/users/alice"),
            Access::Role(Role::Admin)
        );
        // `/admin/*` must not leak onto sibling paths
        assert_eq!(
            p.access_for(&Method::GET, "/administrators"),
            Access::Authenticated
        );
        // `/courses*` is a plain prefix and does match siblings
        assert_eq!(p.access_for(&Method::GET, "/courses-export"), Access::Public);
    }

    #[test]
    fn test_catalog_rules_do_not_leak_onto_siblings() {
        let p = RoutePolicy::new(Access::Authenticated)
            .rule(RouteRule::new("/courses/*", Access::Public).with_method(Method::GET));

        assert_eq!(p.access_for(&Method::GET, "/courses"), Access::Public);
        assert_eq!(
            p.access_for(&Method::GET, "/courses/42/reviews"),
            Access::Public
        );
        assert_eq!(
            p.access_for(&Method::GET, "/courses-export"),
            Access::Authenticated
        );
        assert_eq!(
            p.access_for(&Method::GET, "/coursesadmin"),
            Access::Authenticated
        );
    }

    #[test]
    fn test_exact_root_and_default() {
        let p = policy();
        assert_eq!(p.access_for(&Method::GET, "/"), Access::Public);
        assert_eq!(
            p.access_for(&Method::GET, "/anything-else"),
            Access::Authenticated
        );
    }
}
