//! Variable resolution
//!
//! Turns a caller's selection (a `%` wildcard pattern or an explicit name
//! list) into an ordered, de-duplicated [`VariableSet`].
//!
//! Explicit lists keep the caller's order. Names the backend does not know
//! are dropped with a warning and reported in [`Resolution::missing`]; the
//! call goes on with the names that were found. Pattern results keep the
//! backend's discovery order.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::MetaService;
use crate::error::Result;
use crate::types::VariableSet;

/// What the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Wildcard pattern, `%` matches any sequence
    Pattern(String),
    /// Explicit names, looked up one by one
    Names(Vec<String>),
}

impl Selection {
    /// The first explicitly requested name, if this is a list
    pub fn first_name(&self) -> Option<&str> {
        match self {
            Selection::Names(names) => names.first().map(String::as_str),
            Selection::Pattern(_) => None,
        }
    }
}

impl From<&str> for Selection {
    fn from(pattern: &str) -> Self {
        Selection::Pattern(pattern.to_string())
    }
}

impl From<String> for Selection {
    fn from(pattern: String) -> Self {
        Selection::Pattern(pattern)
    }
}

impl From<Vec<String>> for Selection {
    fn from(names: Vec<String>) -> Self {
        Selection::Names(names)
    }
}

impl From<Vec<&str>> for Selection {
    fn from(names: Vec<&str>) -> Self {
        Selection::Names(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Selection {
    fn from(names: &[&str]) -> Self {
        Selection::Names(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Selection {
    fn from(names: [&str; N]) -> Self {
        Selection::Names(names.iter().map(|s| s.to_string()).collect())
    }
}

/// Outcome of resolving a selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Variables found, in selection order
    pub variables: VariableSet,
    /// Explicitly requested names the backend does not know
    pub missing: Vec<String>,
}

impl Resolution {
    /// Whether nothing was found
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Resolves selections against the backend namespace
#[derive(Clone)]
pub struct VariableResolver {
    meta: Arc<dyn MetaService>,
}

impl VariableResolver {
    /// Create a resolver over a metadata service
    pub fn new(meta: Arc<dyn MetaService>) -> Self {
        Self { meta }
    }

    /// Resolve a selection; an empty outcome is not an error
    pub fn resolve(&self, selection: &Selection) -> Result<Resolution> {
        match selection {
            Selection::Pattern(pattern) => {
                let variables = self.meta.variables_like(pattern)?;
                debug!(pattern = %pattern, found = variables.len(), "Resolved pattern");
                Ok(Resolution {
                    variables,
                    missing: Vec::new(),
                })
            }
            Selection::Names(names) => {
                let found = self.meta.variables_named(names)?;
                let mut resolution = Resolution::default();

                for name in names {
                    match found.get(name) {
                        Some(variable) => {
                            resolution.variables.insert(variable.clone());
                        }
                        None if !resolution.missing.contains(name) => {
                            resolution.missing.push(name.clone());
                        }
                        None => {}
                    }
                }

                if !resolution.missing.is_empty() {
                    warn!(
                        missing = %resolution.missing.join(", "),
                        "Variables not found, skipping them"
                    );
                }
                Ok(resolution)
            }
        }
    }
}

impl std::fmt::Debug for VariableResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableResolver").finish_non_exhaustive()
    }
}
