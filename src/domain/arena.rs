use generational_arena::{Arena, Index};
use std::fmt;
use termtree::Tree;
use tracing::instrument;

use crate::domain::document::TreeDocument;
use crate::domain::error::DomainError;

/// Tree node in the arena-based syntax tree.
#[derive(Debug)]
pub struct SyntaxNode {
    /// Category-tagged label, e.g. `Function` or `Var: x`
    pub label: String,
    /// Distance from the root (root = 0)
    pub depth: usize,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in document order
    pub children: Vec<Index>,
}

impl SyntaxNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Arena-based rooted tree built from a fetched tree document.
///
/// Built fresh for every render and never mutated afterwards.
#[derive(Debug)]
pub struct SyntaxTree {
    arena: Arena<SyntaxNode>,
    root: Index,
}

impl SyntaxTree {
    /// Build the arena from a tree document.
    ///
    /// Walks the document iteratively so deep trees do not grow the call stack.
    /// Child order is preserved.
    #[instrument(level = "debug", skip(document), fields(root = %document.name))]
    pub fn from_document(document: &TreeDocument) -> Result<Self, DomainError> {
        let mut arena = Arena::new();
        let root = arena.insert(SyntaxNode {
            label: checked_label(document, &[])?,
            depth: 0,
            parent: None,
            children: Vec::new(),
        });

        // (document node, arena index, child-index path)
        let mut stack: Vec<(&TreeDocument, Index, Vec<usize>)> = vec![(document, root, Vec::new())];
        while let Some((doc, idx, path)) = stack.pop() {
            let depth = arena[idx].depth + 1;
            let mut child_indices = Vec::with_capacity(doc.children().len());
            for (position, child) in doc.children().iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(position);
                let child_idx = arena.insert(SyntaxNode {
                    label: checked_label(child, &child_path)?,
                    depth,
                    parent: Some(idx),
                    children: Vec::new(),
                });
                child_indices.push(child_idx);
                stack.push((child, child_idx, child_path));
            }
            arena[idx].children = child_indices;
        }

        Ok(Self { arena, root })
    }

    pub fn get_node(&self, idx: Index) -> Option<&SyntaxNode> {
        self.arena.get(idx)
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of levels (a single root has depth 1).
    pub fn depth(&self) -> usize {
        self.iter().map(|(_, node)| node.depth + 1).max().unwrap_or(0)
    }

    /// Pre-order, left-to-right traversal.
    pub fn iter(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self)
    }

    /// Post-order traversal (children before parents, left to right).
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    pub fn leaf_labels(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, node)| !node.has_children())
            .map(|(_, node)| node.label.as_str())
            .collect()
    }

    /// Render the tree for terminal display.
    pub fn to_termtree(&self) -> Tree<String> {
        fn build(tree: &SyntaxTree, idx: Index) -> Tree<String> {
            let node = &tree.arena[idx];
            let leaves: Vec<_> = node.children.iter().map(|&c| build(tree, c)).collect();
            Tree::new(node.label.clone()).with_leaves(leaves)
        }
        build(self, self.root)
    }
}

fn checked_label(doc: &TreeDocument, path: &[usize]) -> Result<String, DomainError> {
    if doc.name.is_empty() {
        return Err(DomainError::EmptyLabel {
            path: path.to_vec(),
        });
    }
    Ok(doc.name.clone())
}

pub struct PreOrderIterator<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<Index>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(tree: &'a SyntaxTree) -> Self {
        Self {
            tree,
            stack: vec![tree.root],
        }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = (Index, &'a SyntaxNode);

    fn next(&mut self) -> Option<Self::Item> {
        let current_idx = self.stack.pop()?;
        let node = self.tree.get_node(current_idx)?;
        // Push children in reverse order for left-to-right traversal
        self.stack.extend(node.children.iter().rev());
        Some((current_idx, node))
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a SyntaxTree) -> Self {
        Self {
            tree,
            stack: vec![(tree.root, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a SyntaxNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                if visited {
                    return Some((current_idx, node));
                }
                self.stack.push((current_idx, true));
                for &child in node.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}
