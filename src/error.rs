//! Top-level diagnostic error type.
//!
//! Each subsystem defines its own error enum with miette `#[diagnostic]`
//! codes and help text; [`ClirelError`] carries any of them through to the
//! caller unchanged.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::corpus::CorpusError;
use crate::kernel::KernelError;
use crate::relation::RelationError;
use crate::tree::TreeError;

#[derive(Debug, Error, Diagnostic)]
pub enum ClirelError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Relation(#[from] RelationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience result alias.
pub type ClirelResult<T> = std::result::Result<T, ClirelError>;
