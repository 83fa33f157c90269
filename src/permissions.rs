//! Permission Gate
//!
//! TigerStyle: Exact-match allow-lists of `"platform:id"` keys.
//!
//! An empty list is the sentinel for "no restriction". Matching is plain
//! string equality, no normalization.

use std::fmt;

/// `"platform:id"` key used for allow-list membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionKey(String);

impl PermissionKey {
    pub fn new(platform: &str, id: &str) -> Self {
        Self(format!("{}:{}", platform, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered allow-list
#[derive(Debug, Clone, Default)]
pub struct PermissionList {
    /// Which component this list gates (for logs)
    component: &'static str,
    entries: Vec<String>,
}

impl PermissionList {
    pub fn new(component: &'static str, entries: Vec<String>) -> Self {
        Self { component, entries }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.entries.is_empty()
    }

    /// Test membership, logging the decision
    pub fn allows(&self, key: &PermissionKey) -> bool {
        if self.is_unrestricted() {
            tracing::info!(
                component = self.component,
                key = %key,
                "No permission list configured, allowing all"
            );
            return true;
        }

        let allowed = self.entries.iter().any(|entry| entry == key.as_str());
        if allowed {
            tracing::info!(component = self.component, key = %key, "Permission granted");
        } else {
            tracing::warn!(component = self.component, key = %key, "Permission denied");
        }
        allowed
    }
}

// =============================================================================
// Tests
// =============================================================================
