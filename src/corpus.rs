//! Sentence parses keyed by document and line.
//!
//! The parser emits one bracketed tree per sentence line; annotations refer
//! to sentences by (document, line). A [`SentenceBank`] owns those trees and
//! hands out shared references, so every relation instance of a sentence
//! reads the same parse. Kernel evaluation never touches the bank.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::relation::{EntitySpan, RelationError, RelationInstance};
use crate::tree::parse::strip_outer;
use crate::tree::{ParseTree, parse_or_else};

/// Errors from loading parses or looking sentences up.
#[derive(Debug, Error, Diagnostic)]
pub enum CorpusError {
    #[error("failed to read parse file: {path}")]
    #[diagnostic(
        code(clirel::corpus::read),
        help("The parse file must hold one bracketed tree per sentence line.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no sentence at {document}:{line}")]
    #[diagnostic(
        code(clirel::corpus::missing_sentence),
        help(
            "Sentence lines are numbered from 1 in parse-file order. Check that \
             the parse file for this document was loaded and has enough lines."
        )
    )]
    MissingSentence { document: String, line: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Relation(#[from] RelationError),
}

/// Result type for corpus operations.
pub type CorpusResult<T> = std::result::Result<T, CorpusError>;

/// Identity of one sentence: document name and 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SentenceKey {
    pub document: String,
    pub line: usize,
}

impl SentenceKey {
    pub fn new(document: impl Into<String>, line: usize) -> Self {
        Self {
            document: document.into(),
            line,
        }
    }
}

/// Summary of one [`SentenceBank::load_parses`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub sentences: usize,
    /// Sentences stored as the empty tree, either because they failed to
    /// parse or because the parser gave up on them.
    pub empty: usize,
}

/// Caller-owned registry of sentence parses.
#[derive(Debug, Clone, Default)]
pub struct SentenceBank {
    trees: HashMap<SentenceKey, Arc<ParseTree>>,
}

impl SentenceBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Store a tree, replacing any previous parse of the same sentence.
    pub fn insert(&mut self, key: SentenceKey, tree: ParseTree) -> Arc<ParseTree> {
        let tree = Arc::new(tree);
        self.trees.insert(key, Arc::clone(&tree));
        tree
    }

    pub fn get(&self, document: &str, line: usize) -> Option<Arc<ParseTree>> {
        self.trees.get(&SentenceKey::new(document, line)).cloned()
    }

    /// Load parser output for one document, one tree per line.
    ///
    /// A malformed line is logged and stored as the empty tree so the line
    /// numbering of the rest of the document is preserved.
    pub fn load_parses<'a>(
        &mut self,
        document: &str,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        for (idx, text) in lines.into_iter().enumerate() {
            let line = idx + 1;
            let tree = parse_or_else(strip_outer(text), |e| {
                tracing::warn!(document, line, error = %e, "malformed parse, substituting empty tree");
            });
            report.sentences += 1;
            if tree.is_empty() {
                report.empty += 1;
            }
            self.trees.insert(SentenceKey::new(document, line), Arc::new(tree));
        }
        tracing::info!(
            document,
            sentences = report.sentences,
            empty = report.empty,
            "loaded sentence parses"
        );
        report
    }

    /// Document name [`load_file`](Self::load_file) stores a parse file's
    /// sentences under: the file stem, or the whole path when there is none.
    pub fn document_name(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// Load a parse file under [`document_name`](Self::document_name).
    pub fn load_file(&mut self, path: &Path) -> CorpusResult<LoadReport> {
        let content = std::fs::read_to_string(path).map_err(|e| CorpusError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(self.load_parses(&Self::document_name(path), content.lines()))
    }

    /// Build a relation instance over a stored sentence.
    pub fn instance(
        &self,
        document: &str,
        line: usize,
        first: EntitySpan,
        second: EntitySpan,
    ) -> CorpusResult<RelationInstance> {
        let tree = self
            .get(document, line)
            .ok_or_else(|| CorpusError::MissingSentence {
                document: document.to_string(),
                line,
            })?;
        Ok(RelationInstance::new(tree, first, second)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::EntityType;

    const PARSES: &str = "( (S (NP (NNP Aspirin)) (VP (VBD relieved) (NP (PRP$ his) (NN headache))) (. .)) )\n\
                          ( (S (NP (DT The)) (VP (VBD ...\n\
                          ( (FRAG (NP (NN CT)) (: :) (NP (JJ negative))) )\n";

    #[test]
    fn loads_one_tree_per_line() {
        let mut bank = SentenceBank::new();
        let report = bank.load_parses("doc1", PARSES.lines());
        assert_eq!(report, LoadReport { sentences: 3, empty: 1 });
        assert_eq!(bank.len(), 3);

        let first = bank.get("doc1", 1).unwrap();
        assert_eq!(first.leaves(), vec!["Aspirin", "relieved", "his", "headache", "."]);
        assert!(bank.get("doc1", 2).unwrap().is_empty());
        assert_eq!(bank.get("doc1", 3).unwrap().root().unwrap().label(), "FRAG");
        assert!(bank.get("doc1", 4).is_none());
        assert!(bank.get("doc2", 1).is_none());
    }

    #[test]
    fn insert_replaces_a_sentence() {
        let mut bank = SentenceBank::new();
        bank.load_parses("doc1", PARSES.lines());
        let fixed = ParseTree::parse("(S (NP (DT The)) (VP (VBD improved)))").unwrap();
        let stored = bank.insert(SentenceKey::new("doc1", 2), fixed.clone());
        assert_eq!(*stored, fixed);
        assert_eq!(bank.get("doc1", 2).unwrap().leaves(), vec!["The", "improved"]);
        assert_eq!(bank.len(), 3);
    }

    #[test]
    fn instances_share_the_sentence_tree() {
        let mut bank = SentenceBank::new();
        bank.load_parses("doc1", PARSES.lines());
        let a = bank
            .instance(
                "doc1",
                1,
                EntitySpan::new(0, 0, EntityType::Treatment),
                EntitySpan::new(2, 3, EntityType::Problem),
            )
            .unwrap();
        let b = bank
            .instance(
                "doc1",
                1,
                EntitySpan::new(2, 3, EntityType::Problem),
                EntitySpan::new(2, 3, EntityType::Problem),
            )
            .unwrap();
        assert!(std::ptr::eq(a.tree(), b.tree()));
    }

    #[test]
    fn instance_errors() {
        let mut bank = SentenceBank::new();
        bank.load_parses("doc1", PARSES.lines());
        let problem = EntitySpan::new(0, 0, EntityType::Problem);
        assert!(matches!(
            bank.instance("doc1", 9, problem, problem),
            Err(CorpusError::MissingSentence { line: 9, .. })
        ));
        assert!(matches!(
            bank.instance(
                "doc1",
                1,
                EntitySpan::new(0, 0, EntityType::Test),
                EntitySpan::new(2, 3, EntityType::Treatment),
            ),
            Err(CorpusError::Relation(RelationError::InvalidEntityPair { .. }))
        ));
    }

    #[test]
    fn load_file_names_document_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record-13.parse");
        std::fs::write(&path, PARSES).unwrap();
        let mut bank = SentenceBank::new();
        let report = bank.load_file(&path).unwrap();
        assert_eq!(report.sentences, 3);
        assert!(bank.get("record-13", 3).is_some());
        assert_eq!(SentenceBank::document_name(&path), "record-13");
        assert_eq!(SentenceBank::document_name(Path::new("..")), "..");

        assert!(matches!(
            bank.load_file(&dir.path().join("missing.parse")),
            Err(CorpusError::Read { .. })
        ));
    }
}
