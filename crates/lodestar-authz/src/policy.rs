//! Role policy registry.
//!
//! Maps path patterns to the role required to reach them. A rule guards a
//! request path when its pattern matches the whole path or its leading
//! segments, so `/admin` guards `/admin/users` but not `/administrator`.
//!
//! When several rules guard a path the winner is, in order:
//!
//! 1. a literal pattern equal to the path,
//! 2. the guarding pattern with the most segments,
//! 3. the rule registered first.

use lodestar_core::{DenialReason, Principal};
use lodestar_router::PathPattern;

use crate::error::{AuthzError, AuthzResult};

/// One registered rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRule {
    pattern: PathPattern,
    role: String,
}

impl RoleRule {
    /// The guarded pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The required role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Returns true for a rule on `/`, which guards every path.
    #[must_use]
    pub fn is_site_wide(&self) -> bool {
        self.pattern.is_empty()
    }

    fn guards(&self, path: &str) -> bool {
        self.pattern.is_prefix_of(path)
    }

    fn rank(&self, path: &str) -> (bool, usize) {
        let exact_literal = self.pattern.is_literal() && self.pattern.matches(path);
        (exact_literal, self.pattern.len())
    }
}

/// What happened to a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A new rule was added.
    Added,
    /// The same pattern and role were already registered; nothing changed.
    Duplicate,
    /// The pattern is already guarded by another role, which keeps winning.
    ///
    /// The rule is stored but never selected.
    Shadowed {
        /// The role that stays in effect.
        existing: String,
    },
}

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// No rule guards the path.
    Public,
    /// A rule guards the path and the principal holds its role.
    Granted {
        /// The role that was checked.
        role: String,
    },
    /// The request must not proceed.
    Denied(DenialReason),
}

impl AccessDecision {
    /// Returns true unless access was denied.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied(_))
    }
}

/// Registry of role requirements keyed by path pattern.
///
/// # Example
///
/// ```rust
/// use lodestar_authz::{AccessDecision, RolePolicy};
/// use lodestar_core::{DenialReason, Principal};
///
/// let mut policy = RolePolicy::new();
/// policy.register("/admin", "admin").unwrap();
///
/// assert_eq!(policy.required_role("/admin/users"), Some("admin"));
/// assert_eq!(policy.required_role("/about"), None);
///
/// let guest = policy.check("/admin", None);
/// assert_eq!(guest, AccessDecision::Denied(DenialReason::Unauthenticated));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePolicy {
    rules: Vec<RoleRule>,
}

impl RolePolicy {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `role` for paths guarded by `pattern`.
    ///
    /// # Errors
    ///
    /// Fails for an invalid pattern or a blank role.
    pub fn register(&mut self, pattern: &str, role: &str) -> AuthzResult<Registration> {
        let role = role.trim();
        if role.is_empty() {
            return Err(AuthzError::EmptyRole {
                pattern: pattern.to_string(),
            });
        }
        let pattern = PathPattern::parse(pattern)?;

        if let Some(existing) = self.rules.iter().find(|r| r.pattern == pattern) {
            if existing.role == role {
                return Ok(Registration::Duplicate);
            }
            let existing = existing.role.clone();
            tracing::warn!(
                pattern = %pattern,
                role = %role,
                existing = %existing,
                "Role rule shadowed by an earlier rule for the same pattern"
            );
            self.rules.push(RoleRule {
                pattern,
                role: role.to_string(),
            });
            return Ok(Registration::Shadowed { existing });
        }

        let rule = RoleRule {
            pattern,
            role: role.to_string(),
        };
        if rule.is_site_wide() {
            tracing::warn!(
                role = %rule.role,
                "Role rule on '/' guards every path, including public and login routes"
            );
        }
        self.rules.push(rule);
        Ok(Registration::Added)
    }

    /// The rule deciding access to `path`, if any.
    #[must_use]
    pub fn rule_for(&self, path: &str) -> Option<&RoleRule> {
        let mut best: Option<(&RoleRule, (bool, usize))> = None;
        for rule in self.rules.iter().filter(|r| r.guards(path)) {
            let rank = rule.rank(path);
            if best.map_or(true, |(_, best_rank)| rank > best_rank) {
                best = Some((rule, rank));
            }
        }
        best.map(|(rule, _)| rule)
    }

    /// The role required for `path`, if any.
    #[must_use]
    pub fn required_role(&self, path: &str) -> Option<&str> {
        self.rule_for(path).map(RoleRule::role)
    }

    /// Decides whether `principal` may reach `path`.
    ///
    /// A missing principal is rejected before any role comparison.
    #[must_use]
    pub fn check(&self, path: &str, principal: Option<&Principal>) -> AccessDecision {
        let Some(role) = self.required_role(path) else {
            return AccessDecision::Public;
        };
        match principal {
            None => AccessDecision::Denied(DenialReason::Unauthenticated),
            Some(p) if p.has_role(role) => AccessDecision::Granted {
                role: role.to_string(),
            },
            Some(_) => AccessDecision::Denied(DenialReason::InsufficientRole {
                required: role.to_string(),
            }),
        }
    }

    /// Iterates over rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &RoleRule> {
        self.rules.iter()
    }

    /// Number of stored rules, shadowed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
