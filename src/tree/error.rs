//! Diagnostic error types for the tree subsystem.
//!
//! Covers bracket parsing and span location. Parse failures are recoverable
//! per sentence (see [`super::parse_or_empty`]); span failures are surfaced
//! to the caller of the enrichment.

use miette::Diagnostic;
use thiserror::Error;

use super::span::TokenSpan;

/// Errors produced while parsing or searching constituency trees.
#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    #[error("malformed tree at byte {position}: {message}")]
    #[diagnostic(
        code(clirel::tree::malformed),
        help(
            "The bracket string could not be read as a constituency tree. \
             Every node must look like \"(LABEL token)\" or \"(LABEL (child) ...)\" \
             with balanced parentheses. Literal parentheses inside tokens must be \
             replaced with <LPAR>/<RPAR> before parsing."
        )
    )]
    MalformedTree { position: usize, message: String },

    #[error("span {span} (\"{text}\") does not occur in the tree")]
    #[diagnostic(
        code(clirel::tree::span_not_found),
        help(
            "No subtree yields the requested token sequence. Check that the entity \
             indices were computed against the same tokenization as the parse."
        )
    )]
    SpanNotFound { span: TokenSpan, text: String },

    #[error("span {span} is invalid for a sentence of {leaf_count} token(s)")]
    #[diagnostic(
        code(clirel::tree::span_out_of_range),
        help("Entity spans are 0-based and inclusive; start must not exceed end, and end must be a valid token index.")
    )]
    SpanOutOfRange { span: TokenSpan, leaf_count: usize },
}

/// Result type for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;
