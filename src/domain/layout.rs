//! Tidy-tree layout.
//!
//! Reingold-Tilford with Walker's linear-time apportioning (Buchheim, Jünger
//! and Leipert), in the node-size-free variant: the breadth extent is
//! normalised into a fixed logical canvas afterwards. Depth runs along x,
//! sibling order along y.
//!
//! The engine keeps no state between calls. The same tree always produces
//! the same `Diagram`, down to the bit.

use std::collections::HashMap;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::SyntaxTree;
use crate::domain::classify::{classify, NodeCategory};

/// Canvas margins in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 80.0,
            right: 120.0,
            bottom: 80.0,
            left: 120.0,
        }
    }
}

/// Geometry and spacing parameters for one layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Logical canvas width
    pub width: f64,
    /// Logical canvas height
    pub height: f64,
    pub margin: Margin,
    /// Space kept free after the deepest level for leaf labels
    pub label_reserve: f64,
    /// Separation between nodes sharing a parent
    pub sibling_separation: f64,
    /// Separation between nodes with different parents
    pub cousin_separation: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 1000.0,
            margin: Margin::default(),
            label_reserve: 200.0,
            sibling_separation: 2.5,
            cousin_separation: 2.0,
        }
    }
}

impl LayoutConfig {
    /// Extent available along the sibling axis.
    pub fn breadth_size(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }

    /// Extent available along the depth axis.
    pub fn depth_size(&self) -> f64 {
        self.width - self.margin.left - self.margin.right - self.label_reserve
    }
}

/// A positioned node. `id` is the node's pre-order position.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub label: String,
    pub category: NodeCategory,
    pub depth: usize,
    /// Position along the sibling axis, inside `[0, breadth_size]`
    pub breadth: f64,
    /// Position along the depth axis, inside `[0, depth_size]`
    pub offset: f64,
    pub has_children: bool,
}

/// Parent to child connection. Topology only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEdge {
    pub source: usize,
    pub target: usize,
}

/// Immutable result of one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub config: LayoutConfig,
}

impl Diagram {
    pub fn node(&self, id: usize) -> Option<&LayoutNode> {
        self.nodes.get(id)
    }

    /// Canvas coordinates of a node (margins applied, depth along x).
    pub fn position(&self, node: &LayoutNode) -> (f64, f64) {
        (
            self.config.margin.left + node.offset,
            self.config.margin.top + node.breadth,
        )
    }

    /// Horizontal link between the centres of an edge's endpoints.
    pub fn link(&self, edge: &LayoutEdge) -> Option<Link> {
        let source = self.position(self.node(edge.source)?);
        let target = self.position(self.node(edge.target)?);
        Some(Link { source, target })
    }

    /// Positions relative to the root, for comparing two renders.
    pub fn relative_positions(&self) -> Vec<(f64, f64)> {
        let Some(root) = self.nodes.first() else {
            return Vec::new();
        };
        let (rx, ry) = self.position(root);
        self.nodes
            .iter()
            .map(|n| {
                let (x, y) = self.position(n);
                (x - rx, y - ry)
            })
            .collect()
    }
}

/// Smooth connector between parent and child centres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub source: (f64, f64),
    pub target: (f64, f64),
}

impl Link {
    /// Cubic Bezier with both control points on the x midpoint.
    pub fn to_svg_path(&self) -> String {
        let (x0, y0) = self.source;
        let (x1, y1) = self.target;
        let mx = (x0 + x1) / 2.0;
        format!("M{x0:.2},{y0:.2}C{mx:.2},{y0:.2},{mx:.2},{y1:.2},{x1:.2},{y1:.2}")
    }
}

/// Stateless layout engine.
#[derive(Debug, Clone, Default)]
pub struct TreeLayoutEngine {
    config: LayoutConfig,
}

impl TreeLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    #[instrument(level = "debug", skip(self, tree), fields(nodes = tree.node_count()))]
    pub fn layout(&self, tree: &SyntaxTree) -> Diagram {
        let order: Vec<Index> = tree.iter().map(|(idx, _)| idx).collect();
        let ids: HashMap<Index, usize> = order.iter().enumerate().map(|(id, &idx)| (idx, id)).collect();
        let postorder: Vec<usize> = tree.iter_postorder().map(|(idx, _)| ids[&idx]).collect();

        let mut walker = Walker::new(tree, &order, &ids, &self.config);
        walker.run(&postorder);
        let (breadth, offset) = walker.normalise(tree, &order, &self.config);

        let mut nodes = Vec::with_capacity(order.len());
        let mut edges = Vec::with_capacity(order.len().saturating_sub(1));
        for (id, &idx) in order.iter().enumerate() {
            let Some(node) = tree.get_node(idx) else {
                continue;
            };
            let parent = node.parent.map(|p| ids[&p]);
            if let Some(source) = parent {
                edges.push(LayoutEdge { source, target: id });
            }
            nodes.push(LayoutNode {
                id,
                parent,
                label: node.label.clone(),
                category: classify(&node.label),
                depth: node.depth,
                breadth: breadth[id],
                offset: offset[id],
                has_children: node.has_children(),
            });
        }
        debug!("layout: {} nodes, {} edges", nodes.len(), edges.len());

        Diagram {
            nodes,
            edges,
            config: self.config,
        }
    }
}

/// Per-node bookkeeping for the walk.
#[derive(Debug, Clone)]
struct WalkNode {
    parent: usize,
    children: Vec<usize>,
    /// Position among siblings
    number: usize,
    ancestor: usize,
    default_ancestor: Option<usize>,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    thread: Option<usize>,
    x: f64,
}

struct Walker {
    nodes: Vec<WalkNode>,
    sibling_separation: f64,
    cousin_separation: f64,
}

impl Walker {
    /// Nodes `0..n` in pre-order plus a sentinel parent of the root at `n`.
    fn new(tree: &SyntaxTree, order: &[Index], ids: &HashMap<Index, usize>, config: &LayoutConfig) -> Self {
        let sentinel = order.len();
        let mut nodes: Vec<WalkNode> = order
            .iter()
            .enumerate()
            .map(|(id, _)| WalkNode {
                parent: sentinel,
                children: Vec::new(),
                number: 0,
                ancestor: id,
                default_ancestor: None,
                prelim: 0.0,
                modifier: 0.0,
                change: 0.0,
                shift: 0.0,
                thread: None,
                x: 0.0,
            })
            .chain(std::iter::once(WalkNode {
                parent: sentinel,
                children: vec![0],
                number: 0,
                ancestor: sentinel,
                default_ancestor: None,
                prelim: 0.0,
                modifier: 0.0,
                change: 0.0,
                shift: 0.0,
                thread: None,
                x: 0.0,
            }))
            .collect();

        for (id, &idx) in order.iter().enumerate() {
            if let Some(node) = tree.get_node(idx) {
                let children: Vec<usize> = node.children.iter().map(|c| ids[c]).collect();
                for (number, &child) in children.iter().enumerate() {
                    nodes[child].parent = id;
                    nodes[child].number = number;
                }
                nodes[id].children = children;
            }
        }

        Self {
            nodes,
            sibling_separation: config.sibling_separation,
            cousin_separation: config.cousin_separation,
        }
    }

    fn sentinel(&self) -> usize {
        self.nodes.len() - 1
    }

    fn run(&mut self, postorder: &[usize]) {
        for &v in postorder {
            self.first_walk(v);
        }
        let sentinel = self.sentinel();
        self.nodes[sentinel].modifier = -self.nodes[0].prelim;
        // pre-order ids are 0..n, so a plain ascending loop visits parents first
        for v in 0..sentinel {
            self.second_walk(v);
        }
    }

    fn separation(&self, a: usize, b: usize) -> f64 {
        if self.nodes[a].parent == self.nodes[b].parent {
            self.sibling_separation
        } else {
            self.cousin_separation
        }
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.first().copied().or(self.nodes[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.last().copied().or(self.nodes[v].thread)
    }

    fn left_sibling(&self, v: usize) -> Option<usize> {
        let number = self.nodes[v].number;
        if number == 0 {
            return None;
        }
        let parent = self.nodes[v].parent;
        self.nodes[parent].children.get(number - 1).copied()
    }

    fn first_walk(&mut self, v: usize) {
        let w = self.left_sibling(v);
        let children = &self.nodes[v].children;
        let bounds = children.first().copied().zip(children.last().copied());
        if let Some((first, last)) = bounds {
            self.execute_shifts(v);
            let midpoint = (self.nodes[first].prelim + self.nodes[last].prelim) / 2.0;
            if let Some(w) = w {
                self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
                self.nodes[v].modifier = self.nodes[v].prelim - midpoint;
            } else {
                self.nodes[v].prelim = midpoint;
            }
        } else if let Some(w) = w {
            self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
        }

        let parent = self.nodes[v].parent;
        let default_ancestor = self.nodes[parent]
            .default_ancestor
            .unwrap_or(self.nodes[parent].children[0]);
        let ancestor = self.apportion(v, w, default_ancestor);
        self.nodes[parent].default_ancestor = Some(ancestor);
    }

    fn second_walk(&mut self, v: usize) {
        let parent_modifier = self.nodes[self.nodes[v].parent].modifier;
        self.nodes[v].x = self.nodes[v].prelim + parent_modifier;
        self.nodes[v].modifier += parent_modifier;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        for i in (0..self.nodes[v].children.len()).rev() {
            let w = self.nodes[v].children[i];
            let node = &mut self.nodes[w];
            node.prelim += shift;
            node.modifier += shift;
            change += node.change;
            shift += node.shift + change;
        }
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let subtrees = (self.nodes[wp].number - self.nodes[wm].number) as f64;
        let change = shift / subtrees;
        self.nodes[wp].change -= change;
        self.nodes[wp].shift += shift;
        self.nodes[wm].change += change;
        self.nodes[wp].prelim += shift;
        self.nodes[wp].modifier += shift;
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let candidate = self.nodes[vim].ancestor;
        if self.nodes[candidate].parent == self.nodes[v].parent {
            candidate
        } else {
            ancestor
        }
    }

    /// Push `v`'s subtree right until it clears every left sibling's subtree.
    fn apportion(&mut self, v: usize, w: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = w else {
            return ancestor;
        };
        let parent = self.nodes[v].parent;
        // inner/outer contours: vi* inside, vo* outside; *p right (v), *m left (w)
        let mut vop = v;
        let mut vom = self.nodes[parent].children[0];
        let mut sip = self.nodes[v].modifier;
        let mut sop = self.nodes[v].modifier;
        let mut sim = self.nodes[w].modifier;
        let mut som = self.nodes[vom].modifier;

        let mut vim = self.next_right(w);
        let mut vip = self.next_left(v);
        while let (Some(im), Some(ip)) = (vim, vip) {
            // outer contours reach at least as deep as the inner ones
            let (Some(om), Some(op)) = (self.next_left(vom), self.next_right(vop)) else {
                break;
            };
            vom = om;
            vop = op;
            self.nodes[vop].ancestor = v;
            let shift = self.nodes[im].prelim + sim - self.nodes[ip].prelim - sip + self.separation(im, ip);
            if shift > 0.0 {
                let wm = self.next_ancestor(im, v, ancestor);
                self.move_subtree(wm, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.nodes[im].modifier;
            sip += self.nodes[ip].modifier;
            som += self.nodes[vom].modifier;
            sop += self.nodes[vop].modifier;
            vim = self.next_right(im);
            vip = self.next_left(ip);
        }

        if let Some(im) = vim {
            if self.next_right(vop).is_none() {
                self.nodes[vop].thread = Some(im);
                self.nodes[vop].modifier += sim - sop;
            }
        }
        if let Some(ip) = vip {
            if self.next_left(vom).is_none() {
                self.nodes[vom].thread = Some(ip);
                self.nodes[vom].modifier += sip - som;
                ancestor = v;
            }
        }
        ancestor
    }

    /// Scale walk output into `[0, breadth_size] x [0, depth_size]`.
    fn normalise(&self, tree: &SyntaxTree, order: &[Index], config: &LayoutConfig) -> (Vec<f64>, Vec<f64>) {
        let count = order.len();
        let depths: Vec<usize> = order
            .iter()
            .map(|&idx| tree.get_node(idx).map(|n| n.depth).unwrap_or(0))
            .collect();

        let mut left = 0;
        let mut right = 0;
        let mut bottom = 0;
        for id in 0..count {
            if self.nodes[id].x < self.nodes[left].x {
                left = id;
            }
            if self.nodes[id].x > self.nodes[right].x {
                right = id;
            }
            if depths[id] > depths[bottom] {
                bottom = id;
            }
        }

        let padding = if left == right {
            1.0
        } else {
            self.separation(left, right) / 2.0
        };
        let tx = padding - self.nodes[left].x;
        let kx = config.breadth_size() / (self.nodes[right].x + padding + tx);
        let max_depth = depths.get(bottom).copied().unwrap_or(0).max(1) as f64;
        let ky = config.depth_size() / max_depth;

        let breadth = (0..count).map(|id| (self.nodes[id].x + tx) * kx).collect();
        let offset = depths.iter().map(|&d| d as f64 * ky).collect();
        (breadth, offset)
    }
}
