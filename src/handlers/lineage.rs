//! Lineage trees of concepts
//!
//! A lineage is rooted at the most distant known ancestor of a focus concept.
//! Ancestors arrive nearest first; each one becomes the new root with the tree
//! built so far hanging beneath it. Descendants arrive nearest first as
//! (parent, child) edges and are attached below nodes already in the tree.
//!
//! Nodes live in an arena indexed by identifier, so grafting only rewrites
//! parent/child indices.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::db::{QueryScope, Row};
use crate::models::ConceptSimpleView;
use crate::services::{ConceptsDataService, ServiceProvider};
use crate::types::{IdeaBankError, Result};

/// How many links are followed in each direction
pub const LINEAGE_MAX_DEPTH: i64 = 10;

/// One row of a recursive link walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptLinkEdge {
    pub ancestor: String,
    pub descendant: String,
    pub depth: i64,
}

impl TryFrom<Row> for ConceptLinkEdge {
    type Error = IdeaBankError;

    fn try_from(row: Row) -> Result<Self> {
        Ok(Self {
            ancestor: row.get("ancestor")?,
            descendant: row.get("descendant")?,
            depth: row.get("depth")?,
        })
    }
}

#[derive(Debug)]
struct LineageNode {
    identifier: String,
    view: ConceptSimpleView,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Rooted tree of concepts; every identifier appears once
#[derive(Debug)]
pub struct LineageTree {
    nodes: Vec<LineageNode>,
    index: HashMap<String, usize>,
    root: usize,
}

impl LineageTree {
    pub fn new(identifier: impl Into<String>, view: ConceptSimpleView) -> Self {
        let identifier = identifier.into();
        let mut index = HashMap::new();
        index.insert(identifier.clone(), 0);
        Self {
            nodes: vec![LineageNode {
                identifier,
                view,
                parent: None,
                children: Vec::new(),
            }],
            index,
            root: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> &str {
        &self.nodes[self.root].identifier
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    pub fn parent_of(&self, identifier: &str) -> Option<&str> {
        let node = &self.nodes[*self.index.get(identifier)?];
        node.parent.map(|p| self.nodes[p].identifier.as_str())
    }

    pub fn children_of(&self, identifier: &str) -> Vec<&str> {
        self.index
            .get(identifier)
            .map(|&i| {
                self.nodes[i]
                    .children
                    .iter()
                    .map(|&c| self.nodes[c].identifier.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Hops from the root, `None` when absent
    pub fn depth_of(&self, identifier: &str) -> Option<usize> {
        let mut at = *self.index.get(identifier)?;
        let mut depth = 0;
        while let Some(parent) = self.nodes[at].parent {
            at = parent;
            depth += 1;
        }
        Some(depth)
    }

    fn push(&mut self, identifier: String, view: ConceptSimpleView, parent: Option<usize>) -> usize {
        let slot = self.nodes.len();
        self.index.insert(identifier.clone(), slot);
        self.nodes.push(LineageNode {
            identifier,
            view,
            parent,
            children: Vec::new(),
        });
        slot
    }

    /// Make `identifier` the new root with the current tree as its only child.
    /// Returns false, leaving the tree untouched, if it is already present.
    pub fn graft_under(&mut self, identifier: impl Into<String>, view: ConceptSimpleView) -> bool {
        let identifier = identifier.into();
        if self.contains(&identifier) {
            return false;
        }
        let old_root = self.root;
        let slot = self.push(identifier, view, None);
        self.nodes[slot].children.push(old_root);
        self.nodes[old_root].parent = Some(slot);
        self.root = slot;
        true
    }

    /// Add `identifier` as a child of `parent`.
    /// Returns false if `identifier` is already present.
    pub fn attach(
        &mut self,
        parent: &str,
        identifier: impl Into<String>,
        view: ConceptSimpleView,
    ) -> Result<bool> {
        let identifier = identifier.into();
        let Some(&parent_slot) = self.index.get(parent) else {
            return Err(IdeaBankError::Internal(format!(
                "Cannot attach {identifier}: parent {parent} is not in the lineage"
            )));
        };
        if self.contains(&identifier) {
            return Ok(false);
        }
        let slot = self.push(identifier, view, Some(parent_slot));
        self.nodes[parent_slot].children.push(slot);
        Ok(true)
    }

    /// Nested form: inner nodes are `{id: {"children": [..], "data": view}}`,
    /// leaves are `{id: {"data": view}}`; children are ordered by identifier
    pub fn to_value(&self) -> Value {
        self.node_value(self.root)
    }

    fn node_value(&self, slot: usize) -> Value {
        let node = &self.nodes[slot];
        let mut body = Map::new();

        if !node.children.is_empty() {
            let mut children = node.children.clone();
            children.sort_by(|a, b| self.nodes[*a].identifier.cmp(&self.nodes[*b].identifier));
            body.insert(
                "children".into(),
                Value::Array(children.into_iter().map(|c| self.node_value(c)).collect()),
            );
        }
        body.insert("data".into(), json!(node.view));

        let mut wrapper = Map::new();
        wrapper.insert(node.identifier.clone(), Value::Object(body));
        Value::Object(wrapper)
    }
}

/// Assembles the lineage of a concept from its link walks
pub struct LineageBuilder<'a> {
    provider: &'a ServiceProvider,
}

impl<'a> LineageBuilder<'a> {
    pub fn new(provider: &'a ServiceProvider) -> Self {
        Self { provider }
    }

    fn view(&self, identifier: &str) -> Result<ConceptSimpleView> {
        Ok(ConceptSimpleView {
            identifier: identifier.to_string(),
            thumbnail_url: self.provider.share_item(&format!("thumbnails/{identifier}"))?,
        })
    }

    /// Walk the links around `focus` inside `scope` and build its tree
    pub fn build(&self, scope: &mut QueryScope, focus: &str) -> Result<LineageTree> {
        scope.add_query(ConceptsDataService::find_parent_ideas(focus, LINEAGE_MAX_DEPTH));
        scope.exec_next()?;
        let parents = scope
            .results()?
            .all()
            .map(ConceptLinkEdge::try_from)
            .collect::<Result<Vec<_>>>()?;

        scope.add_query(ConceptsDataService::find_child_ideas(focus, LINEAGE_MAX_DEPTH));
        scope.exec_next()?;
        let children = scope
            .results()?
            .all()
            .map(ConceptLinkEdge::try_from)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            focus,
            ancestors = parents.len(),
            descendants = children.len(),
            "Assembling lineage"
        );
        assemble(focus, parents, children, |id| self.view(id))
    }
}

/// Build the tree from edge lists already ordered nearest first
pub fn assemble(
    focus: &str,
    parents: impl IntoIterator<Item = ConceptLinkEdge>,
    children: impl IntoIterator<Item = ConceptLinkEdge>,
    view: impl Fn(&str) -> Result<ConceptSimpleView>,
) -> Result<LineageTree> {
    let mut tree = LineageTree::new(focus, view(focus)?);

    for edge in parents {
        if tree.contains(&edge.ancestor) {
            debug!("Ancestor {} already in lineage", edge.ancestor);
            continue;
        }
        let node_view = view(&edge.ancestor)?;
        tree.graft_under(edge.ancestor, node_view);
    }

    for edge in children {
        if tree.contains(&edge.descendant) {
            debug!("Descendant {} already in lineage", edge.descendant);
            continue;
        }
        let node_view = view(&edge.descendant)?;
        tree.attach(&edge.ancestor, edge.descendant, node_view)?;
    }

    Ok(tree)
}
