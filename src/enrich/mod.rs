//! Tree enrichment: inject entity-type information into a parse.
//!
//! Every strategy first trims the sentence to the smallest subtree covering
//! both entities, then rewrites the nodes that belong to either entity:
//!
//! - **Trim** (`spt`): the trimmed subtree as-is.
//! - **Insert**: each entity's subtree gets a new parent labeled with its type.
//! - **Suffix**: every label inside each entity's subtree gets `-<type>` appended.
//!
//! All functions are pure: the input tree is never modified.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::tree::span::locate;
use crate::tree::{Node, NodePath, ParseTree, TokenSpan, TreeError, TreeResult};

/// Which rewrite to apply before tree-kernel evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentMode {
    /// Shortest-path tree: trim only.
    #[default]
    #[serde(rename = "spt", alias = "trim")]
    Trim,
    /// Wrap entity subtrees in type-labeled nodes.
    Insert,
    /// Suffix entity subtree labels with the type.
    Suffix,
}

impl std::fmt::Display for EnrichmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichmentMode::Trim => write!(f, "spt"),
            EnrichmentMode::Insert => write!(f, "insert"),
            EnrichmentMode::Suffix => write!(f, "suffix"),
        }
    }
}

impl std::str::FromStr for EnrichmentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spt" | "trim" => Ok(EnrichmentMode::Trim),
            "insert" | "insertion" => Ok(EnrichmentMode::Insert),
            "suffix" | "suffixing" => Ok(EnrichmentMode::Suffix),
            _ => Err(ConfigError::UnknownMode {
                name: s.to_string(),
            }),
        }
    }
}

/// A token range together with the label used to mark it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMark<'a> {
    pub span: TokenSpan,
    pub label: &'a str,
}

impl<'a> EntityMark<'a> {
    pub fn new(span: TokenSpan, label: &'a str) -> Self {
        Self { span, label }
    }
}

/// Apply `mode` to `tree` for the two marked entities.
pub fn enrich(
    tree: &ParseTree,
    mode: EnrichmentMode,
    first: EntityMark<'_>,
    second: EntityMark<'_>,
) -> TreeResult<ParseTree> {
    match mode {
        EnrichmentMode::Trim => trim(tree, first.span, second.span),
        EnrichmentMode::Insert => insert(tree, first, second),
        EnrichmentMode::Suffix => suffix(tree, first, second),
    }
}

/// The smallest subtree whose yield covers both spans.
pub fn trim(tree: &ParseTree, first: TokenSpan, second: TokenSpan) -> TreeResult<ParseTree> {
    Bounded::new(tree, first, second).map(|b| b.tree)
}

/// Trim, then wrap each entity's subtree in a node labeled with its mark.
pub fn insert(
    tree: &ParseTree,
    first: EntityMark<'_>,
    second: EntityMark<'_>,
) -> TreeResult<ParseTree> {
    let bounded = Bounded::new(tree, first.span, second.span)?;
    let first_path = bounded.locate(tree, first.span)?;
    let second_path = bounded.locate(tree, second.span)?;

    let root = bounded.root()?;
    let root = wrap_at(root, &first_path, first.label, first.span)?;
    let second_path = second_path.after_wrap(&first_path);
    let root = wrap_at(&root, &second_path, second.label, second.span)?;
    Ok(ParseTree::new(root))
}

/// Trim, then suffix every label inside each entity's subtree.
pub fn suffix(
    tree: &ParseTree,
    first: EntityMark<'_>,
    second: EntityMark<'_>,
) -> TreeResult<ParseTree> {
    let bounded = Bounded::new(tree, first.span, second.span)?;
    let first_path = bounded.locate(tree, first.span)?;
    let second_path = bounded.locate(tree, second.span)?;

    let root = bounded.root()?;
    let root = suffix_at(root, &first_path, first.label, first.span)?;
    let root = suffix_at(&root, &second_path, second.label, second.span)?;
    Ok(ParseTree::new(root))
}

/// Wrap the subtree located for `span` in a new node labeled `label`,
/// without trimming.
pub fn wrap_span(tree: &ParseTree, span: TokenSpan, label: &str) -> TreeResult<ParseTree> {
    let path = locate(tree, span)?;
    let root = root_of(tree, span)?;
    wrap_at(root, &path, label, span).map(ParseTree::new)
}

/// Suffix every label in the subtree located for `span`, without trimming.
pub fn suffix_span(tree: &ParseTree, span: TokenSpan, label: &str) -> TreeResult<ParseTree> {
    let path = locate(tree, span)?;
    let root = root_of(tree, span)?;
    suffix_at(root, &path, label, span).map(ParseTree::new)
}

/// A sentence trimmed to the bounding subtree of two spans, remembering
/// where the trimmed part starts in the sentence.
struct Bounded {
    tree: ParseTree,
    offset: usize,
}

impl Bounded {
    fn new(tree: &ParseTree, first: TokenSpan, second: TokenSpan) -> TreeResult<Self> {
        let leaf_count = tree.leaves().len();
        first.validate(leaf_count)?;
        second.validate(leaf_count)?;

        let bounds = first.union(&second);
        let path = locate(tree, bounds)?;
        let missing = || not_found(tree, bounds);
        let node = tree.subtree(&path).ok_or_else(missing)?;
        let offset = tree.leaf_offset(&path).ok_or_else(missing)?;
        tracing::debug!(
            %bounds,
            depth = path.depth(),
            offset,
            nodes = node.size(),
            "trimmed to bounding subtree"
        );

        Ok(Self {
            tree: ParseTree::new(node.clone()),
            offset,
        })
    }

    fn root(&self) -> TreeResult<&Node> {
        self.tree.root().ok_or_else(|| TreeError::SpanOutOfRange {
            span: TokenSpan::new(0, 0),
            leaf_count: 0,
        })
    }

    /// Locate a sentence-level span inside the trimmed subtree.
    ///
    /// The span is rebased by the subtree's leaf offset; if the rebased
    /// tokens are not the sentence tokens, the entity lies outside the
    /// trimmed part and is reported as not found.
    fn locate(&self, sentence: &ParseTree, span: TokenSpan) -> TreeResult<NodePath> {
        let full = sentence.leaves();
        let local_leaves = self.tree.leaves();
        let wanted = &full[span.start..=span.end];

        let local = span
            .rebase(self.offset)
            .filter(|local| local.end < local_leaves.len())
            .filter(|local| &local_leaves[local.start..=local.end] == wanted)
            .ok_or_else(|| not_found(sentence, span))?;
        locate(&self.tree, local)
    }
}

fn root_of(tree: &ParseTree, span: TokenSpan) -> TreeResult<&Node> {
    tree.root().ok_or(TreeError::SpanOutOfRange {
        span,
        leaf_count: 0,
    })
}

fn not_found(tree: &ParseTree, span: TokenSpan) -> TreeError {
    let leaves = tree.leaves();
    let text = leaves
        .get(span.start..=span.end)
        .map(|tokens| tokens.join(" "))
        .unwrap_or_default();
    TreeError::SpanNotFound { span, text }
}

fn wrap_at(root: &Node, path: &NodePath, label: &str, span: TokenSpan) -> TreeResult<Node> {
    root.replace_at(path.indices(), |node| {
        Node::non_terminal(label, vec![node.clone()])
    })
    .ok_or_else(|| TreeError::SpanNotFound {
        span,
        text: String::new(),
    })
}

fn suffix_at(root: &Node, path: &NodePath, label: &str, span: TokenSpan) -> TreeResult<Node> {
    root.replace_at(path.indices(), |node| {
        node.map_labels(&|l| format!("{l}-{label}"))
    })
    .ok_or_else(|| TreeError::SpanNotFound {
        span,
        text: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "(S (NP (DT This)) (VP (VBZ is) (NP (DT a) (NN test) (NN sentence))) (. .))";

    fn tree(s: &str) -> ParseTree {
        ParseTree::parse(s).unwrap()
    }

    fn span(start: usize, end: usize) -> TokenSpan {
        TokenSpan::new(start, end)
    }

    #[test]
    fn trim_returns_bounding_subtree() {
        let trimmed = trim(&tree(SENTENCE), span(1, 1), span(3, 4)).unwrap();
        assert_eq!(
            trimmed.to_string(),
            "(VP (VBZ is) (NP (DT a) (NN test) (NN sentence)))"
        );
    }

    #[test]
    fn trim_is_order_independent() {
        let t = tree(SENTENCE);
        assert_eq!(
            trim(&t, span(3, 4), span(1, 1)).unwrap(),
            trim(&t, span(1, 1), span(3, 4)).unwrap()
        );
    }

    #[test]
    fn insertion_wraps_both_entities() {
        let t = tree(SENTENCE);
        let out = insert(
            &t,
            EntityMark::new(span(1, 1), "IS"),
            EntityMark::new(span(3, 4), "TEST"),
        )
        .unwrap();
        assert_eq!(
            out.to_string(),
            "(VP (IS (VBZ is)) (TEST (NP (DT a) (NN test) (NN sentence))))"
        );
        // input untouched
        assert_eq!(t.to_string(), SENTENCE);
    }

    #[test]
    fn insertion_handles_nested_entities() {
        let out = insert(
            &tree(SENTENCE),
            EntityMark::new(span(3, 3), "problem"),
            EntityMark::new(span(2, 4), "test"),
        )
        .unwrap();
        assert_eq!(
            out.to_string(),
            "(test (NP (DT a) (problem (NN test)) (NN sentence)))"
        );
    }

    #[test]
    fn insertion_handles_identical_entities() {
        let out = insert(
            &tree(SENTENCE),
            EntityMark::new(span(3, 4), "problem"),
            EntityMark::new(span(3, 4), "test"),
        )
        .unwrap();
        assert_eq!(
            out.to_string(),
            "(problem (test (NP (DT a) (NN test) (NN sentence))))"
        );
    }

    #[test]
    fn suffix_span_relabels_whole_entity_subtree() {
        let t = tree("(S (OO (JJ medical) (NN problem)) (VP (VBD indicated) (NP (NN x))))");
        let out = suffix_span(&t, span(0, 1), "PROBLEM").unwrap();
        assert_eq!(
            out.to_string(),
            "(S (OO-PROBLEM (JJ-PROBLEM medical) (NN-PROBLEM problem)) (VP (VBD indicated) (NP (NN x))))"
        );
    }

    #[test]
    fn suffixing_marks_disjoint_entities_independently() {
        let out = suffix(
            &tree(SENTENCE),
            EntityMark::new(span(1, 1), "treatment"),
            EntityMark::new(span(3, 4), "problem"),
        )
        .unwrap();
        assert_eq!(
            out.to_string(),
            "(VP (VBZ-treatment is) (NP-problem (DT-problem a) (NN-problem test) (NN-problem sentence)))"
        );
    }

    #[test]
    fn suffixing_stacks_on_nested_entities() {
        let out = suffix(
            &tree(SENTENCE),
            EntityMark::new(span(3, 3), "problem"),
            EntityMark::new(span(2, 4), "test"),
        )
        .unwrap();
        assert_eq!(
            out.to_string(),
            "(NP-test (DT-test a) (NN-problem-test test) (NN-test sentence))"
        );
    }

    #[test]
    fn wrap_span_keeps_the_rest_of_the_sentence() {
        let out = wrap_span(&tree(SENTENCE), span(0, 0), "problem").unwrap();
        assert_eq!(
            out.to_string(),
            "(S (NP (problem (DT This))) (VP (VBZ is) (NP (DT a) (NN test) (NN sentence))) (. .))"
        );
    }

    #[test]
    fn enrich_dispatches_on_mode() {
        let t = tree(SENTENCE);
        let a = EntityMark::new(span(1, 1), "treatment");
        let b = EntityMark::new(span(3, 4), "problem");
        assert_eq!(
            enrich(&t, EnrichmentMode::Trim, a, b).unwrap(),
            trim(&t, a.span, b.span).unwrap()
        );
        assert_eq!(
            enrich(&t, EnrichmentMode::Insert, a, b).unwrap(),
            insert(&t, a, b).unwrap()
        );
        assert_eq!(
            enrich(&t, EnrichmentMode::Suffix, a, b).unwrap(),
            suffix(&t, a, b).unwrap()
        );
    }

    #[test]
    fn out_of_range_entity_is_rejected() {
        let result = insert(
            &tree(SENTENCE),
            EntityMark::new(span(1, 1), "a"),
            EntityMark::new(span(4, 9), "b"),
        );
        assert!(matches!(result, Err(TreeError::SpanOutOfRange { .. })));
    }

    #[test]
    fn entity_outside_coarse_bounding_tree_is_not_found() {
        // tokens 2..3 repeat the text of 0..1 but sit in B, outside the trimmed A
        let t = tree("(S (A (X x) (Y y)) (B (C (X x) (Y y)) (D (X x) (Y y))))");
        let b = Bounded::new(&t, span(0, 1), span(0, 1)).unwrap();
        assert_eq!(b.offset, 0);
        assert!(matches!(
            b.locate(&t, span(2, 3)),
            Err(TreeError::SpanNotFound { .. })
        ));
    }

    #[test]
    fn trim_never_returns_a_subtree_missing_an_entity() {
        let t = tree("(S (X (A a)) (Y (B b) (A a) (B b)))");
        for result in [
            trim(&t, span(0, 0), span(1, 1)),
            insert(&t, EntityMark::new(span(0, 0), "p"), EntityMark::new(span(1, 1), "q")),
            suffix(&t, EntityMark::new(span(0, 0), "p"), EntityMark::new(span(1, 1), "q")),
            wrap_span(&t, span(0, 1), "X"),
        ] {
            assert!(matches!(result, Err(TreeError::SpanNotFound { .. })), "{result:?}");
        }

        let trimmed = trim(&t, span(1, 1), span(2, 2)).unwrap();
        assert_eq!(trimmed.to_string(), "(Y (B b) (A a) (B b))");
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!("spt".parse::<EnrichmentMode>().unwrap(), EnrichmentMode::Trim);
        assert_eq!("Insert".parse::<EnrichmentMode>().unwrap(), EnrichmentMode::Insert);
        assert_eq!("suffix".parse::<EnrichmentMode>().unwrap(), EnrichmentMode::Suffix);
        assert!("bogus".parse::<EnrichmentMode>().is_err());
        assert_eq!(EnrichmentMode::Trim.to_string(), "spt");
    }
}
