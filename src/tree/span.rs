//! Span location: find the smallest subtree whose yield contains a token range.
//!
//! The same words can recur in one sentence ("medical problem ... medical
//! problem"), so a token range is resolved to an *occurrence ordinal*: the
//! number of times its text starts before the range's own start. The descent
//! then walks children left to right, letting each child whose yield contains
//! the text absorb one occurrence until the ordinal reaches zero, and narrows
//! into that child. The search stops at the first node none of whose children
//! can narrow further. Preterminals are never decomposed. A node reached this
//! way must still cover the requested token positions; when it only holds a
//! later copy of the text, the span is reported as not found.

use serde::{Deserialize, Serialize};

use super::error::{TreeError, TreeResult};
use super::{Node, ParseTree};

/// An inclusive, 0-based range of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of tokens covered. Zero for an inverted span.
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both.
    pub fn union(&self, other: &TokenSpan) -> TokenSpan {
        TokenSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both ends left by `offset`, if that keeps them non-negative.
    pub fn rebase(&self, offset: usize) -> Option<TokenSpan> {
        Some(TokenSpan {
            start: self.start.checked_sub(offset)?,
            end: self.end.checked_sub(offset)?,
        })
    }

    /// Check the span against a sentence of `leaf_count` tokens.
    pub fn validate(&self, leaf_count: usize) -> TreeResult<()> {
        if self.start > self.end || self.end >= leaf_count {
            return Err(TreeError::SpanOutOfRange {
                span: *self,
                leaf_count,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for TokenSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Child indices leading from a root to one of its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The path to the root itself.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_prefix_of(&self, other: &NodePath) -> bool {
        other.0.starts_with(&self.0)
    }

    fn push(&mut self, idx: usize) {
        self.0.push(idx);
    }

    /// Path of the same node after a new node has been wrapped around the
    /// node at `wrapped`: every path running through `wrapped` gains a `0`
    /// step right after it.
    pub fn after_wrap(&self, wrapped: &NodePath) -> NodePath {
        if !wrapped.is_prefix_of(self) {
            return self.clone();
        }
        let split = wrapped.depth();
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0[..split]);
        indices.push(0);
        indices.extend_from_slice(&self.0[split..]);
        NodePath(indices)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

/// Number of (possibly overlapping) positions at which `needle` starts in
/// `haystack`, restricted to starts at or after `from`.
fn count_from(haystack: &[&str], needle: &[&str], from: usize) -> usize {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    (from..=haystack.len() - needle.len())
        .filter(|&i| haystack[i..i + needle.len()] == *needle)
        .count()
}

fn occurs_in(node: &Node, needle: &[&str]) -> bool {
    count_from(&node.leaves(), needle, 0) > 0
}

fn descend(node: &Node, needle: &[&str], mut ordinal: usize, path: &mut NodePath) {
    let Node::NonTerminal { children, .. } = node else {
        return;
    };
    for (idx, child) in children.iter().enumerate() {
        if !occurs_in(child, needle) {
            continue;
        }
        if ordinal == 0 {
            path.push(idx);
            descend(child, needle, 0, path);
            return;
        }
        ordinal -= 1;
    }
}

/// Locate the smallest subtree containing the tokens of `span`.
///
/// Fails with [`TreeError::SpanOutOfRange`] when the span does not fit the
/// sentence, which is always the case for the empty tree, and with
/// [`TreeError::SpanNotFound`] when the descent ends on a node that does not
/// cover the span's positions.
pub fn locate(tree: &ParseTree, span: TokenSpan) -> TreeResult<NodePath> {
    let leaves = tree.leaves();
    span.validate(leaves.len())?;
    let needle = &leaves[span.start..=span.end];

    let total = count_from(&leaves, needle, 0);
    let at_or_after = count_from(&leaves, needle, span.start);
    let ordinal = total - at_or_after;

    let Some(root) = tree.root() else {
        return Err(TreeError::SpanOutOfRange { span, leaf_count: 0 });
    };

    let mut path = NodePath::root();
    descend(root, needle, ordinal, &mut path);

    let covers = tree
        .leaf_offset(&path)
        .zip(tree.subtree(&path))
        .is_some_and(|(offset, node)| offset <= span.start && span.end < offset + node.leaf_count());
    if !covers {
        return Err(TreeError::SpanNotFound {
            span,
            text: needle.join(" "),
        });
    }
    tracing::trace!(%span, ordinal, depth = path.depth(), "located span");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(s: &str) -> ParseTree {
        ParseTree::parse(s).unwrap()
    }

    const REPEATED: &str = "(S (NP (JJ medical) (NN problem)) (VP (VBD indicated) (NP (JJ medical) (NN problem))))";

    #[test]
    fn first_occurrence_wins_for_first_span() {
        let t = tree(REPEATED);
        let path = locate(&t, TokenSpan::new(0, 1)).unwrap();
        assert_eq!(path, NodePath::from(vec![0]));
        assert_eq!(t.leaf_offset(&path), Some(0));
    }

    #[test]
    fn second_occurrence_resolved_by_ordinal() {
        let t = tree(REPEATED);
        let path = locate(&t, TokenSpan::new(3, 4)).unwrap();
        assert_eq!(path, NodePath::from(vec![1, 1]));
        assert_eq!(t.leaf_offset(&path), Some(3));
    }

    #[test]
    fn single_token_stops_at_preterminal() {
        let t = tree("(S (NP (DT This)) (VP (VBZ is) (NP (DT a) (NN test) (NN sentence))) (. .))");
        let path = locate(&t, TokenSpan::new(1, 1)).unwrap();
        assert_eq!(t.subtree(&path).unwrap(), &Node::terminal("VBZ", "is"));
    }

    #[test]
    fn cross_constituent_span_returns_common_ancestor() {
        let t = tree("(S (NP (DT This)) (VP (VBZ is) (NP (DT a) (NN test) (NN sentence))) (. .))");
        let path = locate(&t, TokenSpan::new(1, 4)).unwrap();
        assert_eq!(t.subtree(&path).unwrap().label(), "VP");
        let whole = locate(&t, TokenSpan::new(0, 5)).unwrap();
        assert_eq!(whole, NodePath::root());
    }

    #[test]
    fn repeated_single_word_picks_document_order() {
        let t = tree("(S (NP (NN pain)) (VP (VBD worsened) (NP (NN pain))))");
        assert_eq!(locate(&t, TokenSpan::new(0, 0)).unwrap(), NodePath::from(vec![0, 0]));
        assert_eq!(
            locate(&t, TokenSpan::new(2, 2)).unwrap(),
            NodePath::from(vec![1, 1, 0])
        );
    }

    #[test]
    fn invalid_spans_are_rejected() {
        let t = tree(REPEATED);
        assert!(matches!(
            locate(&t, TokenSpan::new(2, 9)),
            Err(TreeError::SpanOutOfRange { leaf_count: 5, .. })
        ));
        assert!(matches!(
            locate(&t, TokenSpan::new(3, 1)),
            Err(TreeError::SpanOutOfRange { .. })
        ));
        assert!(matches!(
            locate(&ParseTree::empty(), TokenSpan::new(0, 0)),
            Err(TreeError::SpanOutOfRange { leaf_count: 0, .. })
        ));
    }

    #[test]
    fn node_holding_a_later_copy_is_not_a_match() {
        // no child holds the first "a b", but Y holds the second one
        let t = tree("(S (X (A a)) (Y (B b) (A a) (B b)))");
        assert!(matches!(
            locate(&t, TokenSpan::new(0, 1)),
            Err(TreeError::SpanNotFound { ref text, .. }) if text == "a b"
        ));
        let path = locate(&t, TokenSpan::new(1, 2)).unwrap();
        assert_eq!(path, NodePath::from(vec![1]));
        assert_eq!(t.leaf_offset(&path), Some(1));
    }

    #[test]
    fn counts_overlapping_occurrences() {
        let hay = ["a", "a", "a"];
        assert_eq!(count_from(&hay, &["a", "a"], 0), 2);
        assert_eq!(count_from(&hay, &["a", "a"], 1), 1);
        assert_eq!(count_from(&hay, &["a", "a"], 2), 0);
    }

    #[test]
    fn path_after_wrap_shifts_descendants() {
        let wrapped = NodePath::from(vec![1]);
        assert_eq!(
            NodePath::from(vec![1, 2]).after_wrap(&wrapped),
            NodePath::from(vec![1, 0, 2])
        );
        assert_eq!(
            NodePath::from(vec![1]).after_wrap(&wrapped),
            NodePath::from(vec![1, 0])
        );
        assert_eq!(
            NodePath::from(vec![0, 3]).after_wrap(&wrapped),
            NodePath::from(vec![0, 3])
        );
        assert_eq!(
            NodePath::from(vec![2]).after_wrap(&NodePath::root()),
            NodePath::from(vec![0, 2])
        );
    }

    #[test]
    fn span_helpers() {
        let a = TokenSpan::new(1, 1);
        let b = TokenSpan::new(3, 4);
        assert_eq!(a.union(&b), TokenSpan::new(1, 4));
        assert_eq!(b.rebase(1), Some(TokenSpan::new(2, 3)));
        assert_eq!(a.rebase(2), None);
        assert_eq!(b.len(), 2);
        assert_eq!(b.to_string(), "[3, 4]");
    }
}
