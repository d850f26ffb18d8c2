//! Immutable rooted tree used by the scorer and the split snapshots.
//!
//! # Overview
//! Nodes are a tagged variant, either a named leaf or an internal node with an
//! ordered list of children, stored in an arena and addressed by index. The
//! post-order is computed once when the topology is built, so every later
//! traversal is a flat loop and never recurses.
//!
//! ```text
//!        6
//!      /   \
//!     2     5          postorder: [0, 1, 2, 3, 4, 5, 6]
//!    / \   / \
//!   0   1 3   4
//!   A   B C   D
//! ```
//!
//! A topology is usually converted from a `phylotree` tree parsed from Newick.
//! Node IDs from the parser are not kept; only the shape, the child order and
//! the leaf labels survive.

use crate::error::{ParsimonyError, Result};
use phylotree::tree::Tree as PhyloTree;

pub type NodeIndex = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf { name: String },
    Internal { children: Vec<NodeIndex> },
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Children in their original order; empty for leaves.
    pub fn children(&self) -> &[NodeIndex] {
        match self {
            Node::Leaf { .. } => &[],
            Node::Internal { children } => children,
        }
    }
}

/// A rooted, ordered, possibly multifurcating tree.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    root: Option<NodeIndex>,
    postorder: Vec<NodeIndex>,
}

impl Topology {
    /// A tree without nodes. Scores to 0 everywhere.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::default()
    }

    /// Parse a Newick string and convert it.
    ///
    /// A tree without parentheses (`A;` or `A:0.5;`) is a single leaf and is
    /// built directly, since `phylotree` cannot parse it.
    pub fn from_newick(newick: &str) -> Result<Self> {
        let newick = newick.trim();
        if !newick.contains('(') {
            return Self::single_leaf(newick);
        }
        let tree = PhyloTree::from_newick(newick)
            .map_err(|e| ParsimonyError::NewickParse(e.to_string()))?;
        Self::from_tree(&tree)
    }

    fn single_leaf(newick: &str) -> Result<Self> {
        let body = newick.strip_suffix(';').unwrap_or(newick);
        let label = match body.rsplit_once(':') {
            Some((label, _length)) => label,
            None => body,
        }
        .trim();
        if label.is_empty() {
            return Err(ParsimonyError::NewickParse(format!(
                "no leaf label in {newick:?}"
            )));
        }

        let mut builder = TopologyBuilder::default();
        let leaf = builder.add_leaf(label);
        builder.build(leaf)
    }

    /// Convert a parsed `phylotree` tree.
    ///
    /// # Algorithm
    /// Explicit-stack DFS from the root. A node is expanded once (children
    /// pushed in reverse so they pop in order) and assembled on its second
    /// visit from the last `k` entries of the `built` stack, which are exactly
    /// its `k` children in order.
    ///
    /// # Errors
    /// `UnnamedLeaf` if a leaf carries no label, `Tree` if the parser's tree is
    /// malformed.
    pub fn from_tree(tree: &PhyloTree) -> Result<Self> {
        if tree.get_leaves().is_empty() {
            return Ok(Self::empty());
        }

        let root_id = tree.get_root()?;
        let mut builder = TopologyBuilder::default();
        let mut stack = vec![(root_id, false)];
        let mut built: Vec<NodeIndex> = Vec::new();

        while let Some((node_id, expanded)) = stack.pop() {
            let node = tree.get(&node_id)?;

            if node.children.is_empty() {
                let name = node
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .ok_or(ParsimonyError::UnnamedLeaf(node_id))?;
                built.push(builder.add_leaf(name));
            } else if !expanded {
                stack.push((node_id, true));
                for &child_id in node.children.iter().rev() {
                    stack.push((child_id, false));
                }
            } else {
                let children = built.split_off(built.len() - node.children.len());
                built.push(builder.add_internal(children)?);
            }
        }

        let root = built.pop().ok_or(ParsimonyError::UnknownNode(root_id))?;
        builder.build(root)
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx)
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.postorder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postorder.is_empty()
    }

    /// Reachable nodes, children before parents, siblings in order.
    /// Every subtree occupies a contiguous run ending at its root.
    pub fn postorder(&self) -> &[NodeIndex] {
        &self.postorder
    }

    /// Reachable leaves in left-to-right order.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeIndex, &str)> + '_ {
        self.postorder.iter().filter_map(|&idx| match &self.nodes[idx] {
            Node::Leaf { name } => Some((idx, name.as_str())),
            Node::Internal { .. } => None,
        })
    }

    pub fn leaf_names(&self) -> Vec<&str> {
        self.leaves().map(|(_, name)| name).collect()
    }

    /// Rename leaves in place. `rename` returns the new label, or `None` to
    /// keep the current one. Returns how many leaves changed.
    pub fn relabel_leaves<F>(&mut self, mut rename: F) -> usize
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut renamed = 0;
        for node in &mut self.nodes {
            if let Node::Leaf { name } = node {
                if let Some(new_name) = rename(name).filter(|n| n.as_str() != name.as_str()) {
                    *name = new_name;
                    renamed += 1;
                }
            }
        }
        renamed
    }
}

/// Bottom-up constructor: children must be added before their parent.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    nodes: Vec<Node>,
}

impl TopologyBuilder {
    pub fn add_leaf(&mut self, name: impl Into<String>) -> NodeIndex {
        self.nodes.push(Node::Leaf { name: name.into() });
        self.nodes.len() - 1
    }

    /// An internal node may have zero children; it then scores as an empty
    /// state set.
    pub fn add_internal(&mut self, children: Vec<NodeIndex>) -> Result<NodeIndex> {
        if let Some(&bad) = children.iter().find(|&&c| c >= self.nodes.len()) {
            return Err(ParsimonyError::UnknownNode(bad));
        }
        self.nodes.push(Node::Internal { children });
        Ok(self.nodes.len() - 1)
    }

    pub fn build(self, root: NodeIndex) -> Result<Topology> {
        if root >= self.nodes.len() {
            return Err(ParsimonyError::UnknownNode(root));
        }
        let postorder = postorder_from(&self.nodes, root);
        Ok(Topology {
            nodes: self.nodes,
            root: Some(root),
            postorder,
        })
    }
}

fn postorder_from(nodes: &[Node], root: NodeIndex) -> Vec<NodeIndex> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack = vec![(root, false)];

    while let Some((idx, expanded)) = stack.pop() {
        let children = nodes[idx].children();
        if expanded || children.is_empty() {
            order.push(idx);
        } else {
            stack.push((idx, true));
            stack.extend(children.iter().rev().map(|&c| (c, false)));
        }
    }

    order
}
