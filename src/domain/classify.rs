//! Node classification: label prefix -> visual category.

use std::fmt;

/// Visual category of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeCategory {
    Function,
    If,
    While,
    Assignment,
    Return,
    VarDecl,
    FunctionCall,
    Parameters,
    Arguments,
    Expr,
    Block,
    Program,
    Default,
}

/// How a category is filled when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Solid(&'static str),
    /// Diagonal linear gradient referenced by id.
    Gradient {
        id: &'static str,
        from: &'static str,
        to: &'static str,
    },
}

impl Fill {
    /// Value for an SVG `fill` attribute.
    pub fn paint(&self) -> String {
        match self {
            Fill::Solid(color) => (*color).to_string(),
            Fill::Gradient { id, .. } => format!("url(#{id})"),
        }
    }
}

pub const FUNCTION_GRADIENT: Fill = Fill::Gradient {
    id: "func-gradient",
    from: "#1971c2",
    to: "#4dabf7",
};

/// Ordered prefix table; first match wins.
///
/// `FunctionCall` precedes `Function`, otherwise every call would be drawn as a definition.
const PREFIXES: &[(&str, NodeCategory)] = &[
    ("FunctionCall", NodeCategory::FunctionCall),
    ("Function", NodeCategory::Function),
    ("If", NodeCategory::If),
    ("While", NodeCategory::While),
    ("Assignment", NodeCategory::Assignment),
    ("Return", NodeCategory::Return),
    ("VarDecl", NodeCategory::VarDecl),
    ("Parameters", NodeCategory::Parameters),
    ("Arguments", NodeCategory::Arguments),
    ("Expr", NodeCategory::Expr),
    ("Block", NodeCategory::Block),
    ("Body", NodeCategory::Block),
    ("Program", NodeCategory::Program),
];

/// Classify a node label. Depends on nothing but the label.
pub fn classify(label: &str) -> NodeCategory {
    PREFIXES
        .iter()
        .find(|(prefix, _)| label.starts_with(prefix))
        .map(|&(_, category)| category)
        .unwrap_or(NodeCategory::Default)
}

impl NodeCategory {
    pub fn fill(&self) -> Fill {
        match self {
            NodeCategory::Function => FUNCTION_GRADIENT,
            NodeCategory::If => Fill::Solid("#ff6f61"),
            NodeCategory::While => Fill::Solid("#6a4c93"),
            NodeCategory::Assignment => Fill::Solid("#43aa8b"),
            NodeCategory::Return => Fill::Solid("#f9c846"),
            NodeCategory::VarDecl => Fill::Solid("#577590"),
            NodeCategory::FunctionCall => Fill::Solid("#f3722c"),
            NodeCategory::Parameters => Fill::Solid("#4d908e"),
            NodeCategory::Arguments => Fill::Solid("#90be6d"),
            NodeCategory::Expr => Fill::Solid("#277da1"),
            NodeCategory::Block => Fill::Solid("#b5838d"),
            NodeCategory::Program => Fill::Solid("#f9844a"),
            NodeCategory::Default => Fill::Solid("#adb5bd"),
        }
    }

    /// CSS class suffix, e.g. `node-function-call`.
    pub fn css_class(&self) -> &'static str {
        match self {
            NodeCategory::Function => "node-function",
            NodeCategory::If => "node-if",
            NodeCategory::While => "node-while",
            NodeCategory::Assignment => "node-assignment",
            NodeCategory::Return => "node-return",
            NodeCategory::VarDecl => "node-var-decl",
            NodeCategory::FunctionCall => "node-function-call",
            NodeCategory::Parameters => "node-parameters",
            NodeCategory::Arguments => "node-arguments",
            NodeCategory::Expr => "node-expr",
            NodeCategory::Block => "node-block",
            NodeCategory::Program => "node-program",
            NodeCategory::Default => "node-default",
        }
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
