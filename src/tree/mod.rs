//! Constituency parse trees.
//!
//! A sentence parse is read once from bracket notation into a [`ParseTree`]
//! and then shared read-only. Rewrites (see [`crate::enrich`]) build new
//! trees instead of touching the original.
//!
//! ```text
//! (S (NP (DT This)) (VP (VBZ is) (NP (DT a) (NN test))) (. .))
//!    └───────┬────┘       └──┬───┘
//!       NonTerminal       Terminal (preterminal: label + token)
//! ```

pub mod error;
pub mod parse;
pub mod span;

use serde::{Deserialize, Serialize};

pub use error::{TreeError, TreeResult};
pub use parse::{escape_token, parse_or_else, parse_or_empty, unescape_token};
pub use span::{NodePath, TokenSpan};

/// A single node of a constituency tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    /// A preterminal: a label that directly dominates one token, e.g. `(NN test)`.
    Terminal { label: String, token: String },
    /// A phrase node with at least one child.
    NonTerminal { label: String, children: Vec<Node> },
}

/// The production of a node: its label and the ordered labels of its children.
///
/// For a [`Node::Terminal`] the single "child" is the token, so two
/// preterminals share a production only when label and word both match.
#[derive(Debug, Clone, Copy)]
pub struct Production<'a> {
    node: &'a Node,
}

impl PartialEq<Production<'_>> for Production<'_> {
    fn eq(&self, other: &Production<'_>) -> bool {
        match (self.node, other.node) {
            (
                Node::Terminal { label: l1, token: t1 },
                Node::Terminal { label: l2, token: t2 },
            ) => l1 == l2 && t1 == t2,
            (
                Node::NonTerminal { label: l1, children: c1 },
                Node::NonTerminal { label: l2, children: c2 },
            ) => {
                l1 == l2
                    && c1.len() == c2.len()
                    && c1.iter().zip(c2).all(|(a, b)| a.label() == b.label())
            }
            _ => false,
        }
    }
}

impl Node {
    /// Build a preterminal node.
    pub fn terminal(label: impl Into<String>, token: impl Into<String>) -> Self {
        Node::Terminal {
            label: label.into(),
            token: token.into(),
        }
    }

    /// Build a phrase node. Callers must supply at least one child.
    pub fn non_terminal(label: impl Into<String>, children: Vec<Node>) -> Self {
        debug_assert!(!children.is_empty(), "non-terminal needs children");
        Node::NonTerminal {
            label: label.into(),
            children,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Node::Terminal { label, .. } | Node::NonTerminal { label, .. } => label,
        }
    }

    /// Children of a phrase node; empty for a preterminal.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Terminal { .. } => &[],
            Node::NonTerminal { children, .. } => children,
        }
    }

    /// Whether this node sits directly above a token.
    pub fn is_preterminal(&self) -> bool {
        matches!(self, Node::Terminal { .. })
    }

    pub fn production(&self) -> Production<'_> {
        Production { node: self }
    }

    /// Tokens under this node, left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Terminal { token, .. } => out.push(token),
            Node::NonTerminal { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Number of tokens under this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Terminal { .. } => 1,
            Node::NonTerminal { children, .. } => children.iter().map(Node::leaf_count).sum(),
        }
    }

    /// Total number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(Node::size).sum::<usize>()
    }

    /// Resolve a path of child indices starting at this node.
    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &idx| node.children().get(idx))
    }

    /// Copy of this subtree with `f` applied to every label.
    pub fn map_labels(&self, f: &impl Fn(&str) -> String) -> Node {
        match self {
            Node::Terminal { label, token } => Node::Terminal {
                label: f(label),
                token: token.clone(),
            },
            Node::NonTerminal { label, children } => Node::NonTerminal {
                label: f(label),
                children: children.iter().map(|c| c.map_labels(f)).collect(),
            },
        }
    }

    /// Copy of this tree with the node at `path` replaced by `f(node)`.
    ///
    /// Returns `None` if the path does not resolve.
    pub fn replace_at(&self, path: &[usize], f: impl FnOnce(&Node) -> Node) -> Option<Node> {
        let Some((&head, rest)) = path.split_first() else {
            return Some(f(self));
        };
        match self {
            Node::Terminal { .. } => None,
            Node::NonTerminal { label, children } => {
                let target = children.get(head)?;
                let replaced = target.replace_at(rest, f)?;
                let mut children = children.clone();
                children[head] = replaced;
                Some(Node::NonTerminal {
                    label: label.clone(),
                    children,
                })
            }
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Terminal { label, token } => write!(f, "({label} {token})"),
            Node::NonTerminal { label, children } => {
                write!(f, "({label}")?;
                for child in children {
                    write!(f, " {child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A sentence parse. The empty tree is the placeholder for sentences whose
/// bracket string could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParseTree {
    root: Option<Node>,
}

impl ParseTree {
    pub fn new(root: Node) -> Self {
        Self { root: Some(root) }
    }

    /// The empty-tree sentinel.
    pub fn empty() -> Self {
        Self { root: None }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Parse a bracket string such as `(S (NP (DT This)) (VP (VBZ is)))`.
    pub fn parse(input: &str) -> TreeResult<Self> {
        parse::parse(input)
    }

    /// Parse one line of parser output, stripping the outer unlabeled
    /// parenthesis pair first: `( (S ...) )` becomes `(S ...)`.
    pub fn from_parser_line(line: &str) -> TreeResult<Self> {
        parse::parse(parse::strip_outer(line))
    }

    /// Tokens of the sentence, left to right. Empty for the empty tree.
    pub fn leaves(&self) -> Vec<&str> {
        self.root.as_ref().map(Node::leaves).unwrap_or_default()
    }

    /// The node a path points at.
    pub fn subtree(&self, path: &NodePath) -> Option<&Node> {
        self.root.as_ref()?.get(path.indices())
    }

    /// Index of the first token dominated by the node at `path`.
    pub fn leaf_offset(&self, path: &NodePath) -> Option<usize> {
        let mut node = self.root.as_ref()?;
        let mut offset = 0;
        for &idx in path.indices() {
            let children = node.children();
            let child = children.get(idx)?;
            offset += children[..idx].iter().map(Node::leaf_count).sum::<usize>();
            node = child;
        }
        Some(offset)
    }
}

impl From<Node> for ParseTree {
    fn from(node: Node) -> Self {
        Self::new(node)
    }
}

impl std::str::FromStr for ParseTree {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serializes to bracket notation; the empty tree renders as `()`.
impl std::fmt::Display for ParseTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.root {
            Some(root) => write!(f, "{root}"),
            None => write!(f, "()"),
        }
    }
}
