//! Presentational node state: stroke, label placement and hover.
//!
//! Hover is a reducer over pointer events. It never touches layout data.

/// Circle radius for every node.
pub const NODE_RADIUS: f64 = 14.0;

/// Horizontal distance between a node centre and its label.
pub const LABEL_OFFSET: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: &'static str,
    pub width: f64,
}

pub const NODE_STROKE: Stroke = Stroke {
    color: "#22223b",
    width: 2.0,
};

pub const HOVER_STROKE: Stroke = Stroke {
    color: "#ffbe0b",
    width: 3.0,
};

/// Which side of the node a label sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAnchor {
    /// Label left of the node, text ends at the anchor
    End,
    /// Label right of the node, text starts at the anchor
    Start,
}

impl LabelAnchor {
    /// Inner nodes put their label on the side away from outgoing edges.
    pub fn for_node(has_children: bool) -> Self {
        if has_children {
            LabelAnchor::End
        } else {
            LabelAnchor::Start
        }
    }

    /// Label x offset relative to the node centre.
    pub fn dx(&self) -> f64 {
        match self {
            LabelAnchor::End => -LABEL_OFFSET,
            LabelAnchor::Start => LABEL_OFFSET,
        }
    }

    /// SVG `text-anchor` value.
    pub fn as_svg(&self) -> &'static str {
        match self {
            LabelAnchor::End => "end",
            LabelAnchor::Start => "start",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Enter(usize),
    Leave(usize),
}

/// Which node, if any, is under the pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverState {
    hovered: Option<usize>,
}

impl HoverState {
    pub fn reduce(self, event: PointerEvent) -> Self {
        match event {
            PointerEvent::Enter(id) => Self { hovered: Some(id) },
            PointerEvent::Leave(id) if self.hovered == Some(id) => Self { hovered: None },
            PointerEvent::Leave(_) => self,
        }
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn stroke_for(&self, id: usize) -> Stroke {
        if self.hovered == Some(id) {
            HOVER_STROKE
        } else {
            NODE_STROKE
        }
    }
}
