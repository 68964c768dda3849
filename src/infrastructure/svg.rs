//! SVG presentation of a laid-out diagram.

use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::domain::classify::{Fill, FUNCTION_GRADIENT};
use crate::domain::interaction::{HoverState, LabelAnchor, HOVER_STROKE, NODE_RADIUS};
use crate::domain::Diagram;
use crate::infrastructure::traits::DiagramSurface;

const LINK_STROKE: &str = "#adb5bd";
const LABEL_COLOR: &str = "#343a40";
const LABEL_FONT: &str = "'Segoe UI', Roboto, sans-serif";

/// Render a diagram as a standalone SVG document.
///
/// The viewBox is the logical canvas; the document scales to its container
/// with `xMidYMid meet`. `hover` selects which node, if any, is drawn
/// emphasised.
pub fn render_svg(diagram: &Diagram, hover: HoverState) -> String {
    let cfg = &diagram.config;
    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"100%\" height=\"100%\" viewBox=\"0 0 {} {}\" preserveAspectRatio=\"xMidYMid meet\">",
        cfg.width, cfg.height
    );
    let _ = write!(
        svg,
        "<style>.node circle:hover{{stroke:{};stroke-width:{}}}</style>",
        HOVER_STROKE.color, HOVER_STROKE.width
    );
    svg.push_str(&gradient_defs());

    let links = diagram
        .edges
        .iter()
        .filter_map(|edge| diagram.link(edge))
        .map(|link| {
            format!(
                "<path class=\"link\" d=\"{}\" fill=\"none\" stroke=\"{LINK_STROKE}\" stroke-width=\"1.2\" stroke-opacity=\"0.8\"/>",
                link.to_svg_path()
            )
        })
        .join("");
    let _ = write!(svg, "<g class=\"links\">{links}</g>");

    svg.push_str("<g class=\"nodes\">");
    for node in &diagram.nodes {
        let (x, y) = diagram.position(node);
        let stroke = hover.stroke_for(node.id);
        let anchor = LabelAnchor::for_node(node.has_children);
        let _ = write!(
            svg,
            "<g class=\"node {}\" data-id=\"{}\" transform=\"translate({x:.2},{y:.2})\">",
            node.category.css_class(),
            node.id
        );
        let _ = write!(
            svg,
            "<circle r=\"{NODE_RADIUS}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\" style=\"filter: drop-shadow(0 2px 8px rgba(80,80,80,0.15))\"/>",
            node.category.fill().paint(),
            stroke.color,
            stroke.width
        );
        let _ = write!(
            svg,
            "<text dy=\"5\" x=\"{}\" text-anchor=\"{}\" style=\"font-size: 13px; font-family: {LABEL_FONT}; fill: {LABEL_COLOR}\">{}</text>",
            anchor.dx(),
            anchor.as_svg(),
            escape_xml(&node.label)
        );
        svg.push_str("</g>");
    }
    svg.push_str("</g></svg>\n");
    svg
}

fn gradient_defs() -> String {
    match FUNCTION_GRADIENT {
        Fill::Gradient { id, from, to } => format!(
            "<defs><linearGradient id=\"{id}\" x1=\"0%\" y1=\"0%\" x2=\"100%\" y2=\"100%\"><stop offset=\"0%\" stop-color=\"{from}\"/><stop offset=\"100%\" stop-color=\"{to}\"/></linearGradient></defs>"
        ),
        Fill::Solid(_) => String::new(),
    }
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Writes each diagram to one SVG file, replacing the previous one atomically.
#[derive(Debug, Clone)]
pub struct SvgFileSurface {
    path: PathBuf,
}

impl SvgFileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagramSurface for SvgFileSurface {
    #[instrument(level = "debug", skip(self, diagram), fields(path = %self.path.display()))]
    fn replace(&self, diagram: &Diagram) -> io::Result<()> {
        let svg = render_svg(diagram, HoverState::default());
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        // write next to the target, then rename over it
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(svg.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!("wrote {} bytes", svg.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interaction::PointerEvent;
    use crate::domain::{SyntaxTree, TreeDocument, TreeLayoutEngine};

    fn diagram() -> Diagram {
        let doc = TreeDocument::branch(
            "Program",
            vec![
                TreeDocument::branch("Function", vec![TreeDocument::leaf("FunctionName: main")]),
                TreeDocument::leaf("Include: <iostream>"),
            ],
        );
        let tree = SyntaxTree::from_document(&doc).unwrap();
        TreeLayoutEngine::default().layout(&tree)
    }

    #[test]
    fn test_render_svg_contains_nodes_links_and_gradient() {
        let svg = render_svg(&diagram(), HoverState::default());

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("viewBox=\"0 0 1600 1000\""));
        assert!(svg.contains("preserveAspectRatio=\"xMidYMid meet\""));
        assert!(svg.contains("id=\"func-gradient\""));
        assert_eq!(svg.matches("<circle").count(), 4);
        assert_eq!(svg.matches("class=\"link\"").count(), 3);
        assert!(svg.contains("fill=\"url(#func-gradient)\""));
        assert!(svg.contains("Include: &lt;iostream&gt;"));
        assert!(!svg.contains("stroke=\"#ffbe0b\" stroke-width"));
    }

    #[test]
    fn test_render_svg_emphasises_hovered_node() {
        let hover = HoverState::default().reduce(PointerEvent::Enter(1));
        let svg = render_svg(&diagram(), hover);
        assert_eq!(svg.matches("stroke=\"#ffbe0b\" stroke-width=\"3\"").count(), 1);
    }

    #[test]
    fn test_label_side_follows_children() {
        let svg = render_svg(&diagram(), HoverState::default());
        // Program and Function have children, the two leaves do not
        assert_eq!(svg.matches("text-anchor=\"end\"").count(), 2);
        assert_eq!(svg.matches("text-anchor=\"start\"").count(), 2);
    }

    #[test]
    fn test_file_surface_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("tree.svg");
        let surface = SvgFileSurface::new(&path);

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "old").unwrap();
        surface.replace(&diagram()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("<svg"));
        assert!(!content.contains("old"));
    }
}
