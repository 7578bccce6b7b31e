//! Lazy tree of metadata groupings
//!
//! ```text
//!   <Top Hierarchy>
//!     ├── Accelerator ─┬── LHC ── Beam_Instrumentation ── {variables}
//!     │                └── SPS
//!     └── _2018_Studies
//! ```
//!
//! Each node discovers its children and attached variables on first access
//! and keeps them for the lifetime of the node. Children are discovered by
//! the parent in one backend call, never one call per child. Concurrent
//! first accesses may both query the backend; the first result stored wins.

pub mod sanitize;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::engine::{HierarchyHandle, MetaService};
use crate::error::Result;

pub use sanitize::sanitize_name;

type ChildMap = BTreeMap<String, Arc<Hierarchy>>;
type VariableMap = BTreeMap<String, String>;

/// Result of looking a name up under a node
#[derive(Debug, Clone)]
pub enum Lookup {
    /// A child grouping
    Node(Arc<Hierarchy>),
    /// A variable attached to this grouping, as its raw name
    Variable(String),
    /// Nothing by that name
    NotFound,
}

impl Lookup {
    /// The child node, if this is one
    pub fn into_node(self) -> Option<Arc<Hierarchy>> {
        match self {
            Lookup::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The raw variable name, if this is a leaf
    pub fn into_variable(self) -> Option<String> {
        match self {
            Lookup::Variable(name) => Some(name),
            _ => None,
        }
    }
}

/// One node of the grouping tree
pub struct Hierarchy {
    name: String,
    handle: Option<HierarchyHandle>,
    meta: Arc<dyn MetaService>,
    children: RwLock<Option<Arc<ChildMap>>>,
    variables: RwLock<Option<Arc<VariableMap>>>,
}

impl Hierarchy {
    /// The root node; it has no handle and no variables
    pub fn root(meta: Arc<dyn MetaService>) -> Arc<Self> {
        Arc::new(Self::node("", None, meta))
    }

    fn node(name: &str, handle: Option<HierarchyHandle>, meta: Arc<dyn MetaService>) -> Self {
        Self {
            name: name.to_string(),
            handle,
            meta,
            children: RwLock::new(None),
            variables: RwLock::new(None),
        }
    }

    /// Sanitized name, empty for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend handle, `None` for the root
    pub fn handle(&self) -> Option<&HierarchyHandle> {
        self.handle.as_ref()
    }

    /// Whether this is the root node
    pub fn is_root(&self) -> bool {
        self.handle().is_none()
    }

    /// Look up a child grouping or attached variable by sanitized name
    ///
    /// Children take precedence over variables with the same sanitized name.
    pub fn get_child(&self, name: &str) -> Result<Lookup> {
        if let Some(node) = self.children()?.get(name) {
            return Ok(Lookup::Node(node.clone()));
        }
        if let Some(raw) = self.variable_map()?.get(name) {
            return Ok(Lookup::Variable(raw.clone()));
        }
        Ok(Lookup::NotFound)
    }

    /// Follow a `/`-separated path of sanitized names
    pub fn walk(self: &Arc<Self>, path: &str) -> Result<Lookup> {
        let mut node = self.clone();
        let mut parts = path.split('/').filter(|p| !p.is_empty()).peekable();
        while let Some(part) = parts.next() {
            let last = parts.peek().is_none();
            match node.get_child(part)? {
                Lookup::Node(child) => node = child,
                leaf @ Lookup::Variable(_) if last => return Ok(leaf),
                _ => return Ok(Lookup::NotFound),
            }
        }
        Ok(Lookup::Node(node))
    }

    /// Sanitized child names, then sanitized variable names, each sorted
    pub fn dir(&self) -> Result<Vec<String>> {
        let mut out: Vec<String> = self.children()?.keys().cloned().collect();
        out.extend(self.variable_map()?.keys().cloned());
        Ok(out)
    }

    /// Raw names of the variables attached to this grouping
    pub fn variables(&self) -> Result<Vec<String>> {
        Ok(self.variable_map()?.values().cloned().collect())
    }

    /// Child nodes keyed by sanitized name
    pub fn children(&self) -> Result<Arc<ChildMap>> {
        if let Some(cached) = self.children.read().as_ref() {
            return Ok(cached.clone());
        }

        let handles = match self.handle() {
            None => self.meta.top_level_hierarchies()?,
            Some(h) => self.meta.child_hierarchies(h)?,
        };
        debug!(node = %self, count = handles.len(), "Discovered child groupings");

        let map: ChildMap = handles
            .into_iter()
            .map(|h| {
                let name = sanitize_name(&h.name);
                let node = Arc::new(Self::node(&name, Some(h), self.meta.clone()));
                (name, node)
            })
            .collect();

        let mut slot = self.children.write();
        Ok(slot.get_or_insert_with(|| Arc::new(map)).clone())
    }

    fn variable_map(&self) -> Result<Arc<VariableMap>> {
        if let Some(cached) = self.variables.read().as_ref() {
            return Ok(cached.clone());
        }

        let raw = match &self.handle {
            None => Vec::new(),
            Some(h) => self.meta.variables_attached_to(h)?,
        };
        let map: VariableMap = raw
            .into_iter()
            .filter(|name| !name.is_empty())
            .map(|name| (sanitize_name(&name), name))
            .collect();

        let mut slot = self.variables.write();
        Ok(slot.get_or_insert_with(|| Arc::new(map)).clone())
    }
}

impl fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle() {
            None => write!(f, "<Top Hierarchy>"),
            Some(h) => write!(
                f,
                "<{}: {}>",
                h.name,
                h.description.as_deref().unwrap_or("")
            ),
        }
    }
}

impl fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hierarchy")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryBackend;

    fn backend() -> Arc<InMemoryBackend> {
        let backend = Arc::new(InMemoryBackend::new());
        let lhc = HierarchyHandle::new("1", "LHC").with_description("Large Hadron Collider");
        backend.add_hierarchy(None, lhc.clone());
        backend.add_hierarchy(None, HierarchyHandle::new("2", "2018 Studies"));
        backend.add_hierarchy(Some(&lhc), HierarchyHandle::new("3", "Beam.Instrumentation"));
        backend.attach_variables(&lhc, &["LHC.BCTFR:A6R4.B1", "HX:FILLN"]);
        backend
    }

    #[test]
    fn test_root_display_and_children() {
        let backend = backend();
        let root = Hierarchy::root(backend.clone());
        assert_eq!(root.to_string(), "<Top Hierarchy>");
        assert!(root.is_root());
        assert_eq!(root.dir().unwrap(), vec!["LHC", "_2018_Studies"]);
        assert!(root.variables().unwrap().is_empty());
    }

    #[test]
    fn test_lookup_node_and_leaf() {
        let root = Hierarchy::root(backend());
        let lhc = root.get_child("LHC").unwrap().into_node().unwrap();
        assert_eq!(lhc.to_string(), "<LHC: Large Hadron Collider>");
        assert_eq!(lhc.handle().map(|h| h.id.as_str()), Some("1"));
        assert!(root.handle().is_none());
        assert_eq!(
            lhc.dir().unwrap(),
            vec!["Beam_Instrumentation", "HX_FILLN", "LHC_BCTFR_A6R4_B1"]
        );
        assert_eq!(
            lhc.get_child("LHC_BCTFR_A6R4_B1").unwrap().into_variable().unwrap(),
            "LHC.BCTFR:A6R4.B1"
        );
        assert!(matches!(lhc.get_child("nope").unwrap(), Lookup::NotFound));
    }

    #[test]
    fn test_discovery_is_memoized() {
        let backend = backend();
        let root = Hierarchy::root(backend.clone());
        let first = root.get_child("LHC").unwrap().into_node().unwrap();
        let second = root.get_child("LHC").unwrap().into_node().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        first.dir().unwrap();
        first.dir().unwrap();
        assert_eq!(backend.hierarchy_queries(), 3);
    }

    #[test]
    fn test_walk() {
        let root = Hierarchy::root(backend());
        let node = root.walk("LHC/Beam_Instrumentation").unwrap().into_node().unwrap();
        assert_eq!(node.name(), "Beam_Instrumentation");
        assert_eq!(
            root.walk("LHC/HX_FILLN").unwrap().into_variable().unwrap(),
            "HX:FILLN"
        );
        assert!(matches!(root.walk("LHC/HX_FILLN/deeper").unwrap(), Lookup::NotFound));
    }
}
