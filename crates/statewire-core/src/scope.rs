//! Scope identifiers for the provider registry.
//!
//! A [`ScopeId`] names the channel through which a provider publishes its
//! store and consumers resolve it. Most applications use the single
//! [`ScopeId::DEFAULT`]; named scopes exist so independent store trees can
//! coexist without seeing each other.

use std::fmt;

/// Identifies a provider scope.
///
/// Scope ids are compared by name, so two `ScopeId::named("settings")`
/// values are the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(&'static str);

impl ScopeId {
    /// The scope used when none is specified.
    pub const DEFAULT: ScopeId = ScopeId("statewire.default");

    /// Create a named scope.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self(name)
    }

    /// The scope's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_scopes_compare_by_name() {
        assert_eq!(ScopeId::named("a"), ScopeId::named("a"));
        assert_ne!(ScopeId::named("a"), ScopeId::named("b"));
        assert_ne!(ScopeId::named("a"), ScopeId::DEFAULT);
    }

    #[test]
    fn default_is_the_default_scope() {
        assert_eq!(ScopeId::default(), ScopeId::DEFAULT);
    }

    #[test]
    fn display_shows_name() {
        assert_eq!(ScopeId::named("settings").to_string(), "settings");
        assert_eq!(ScopeId::named("settings").name(), "settings");
    }
}
