//! Diagnostic error types for kernel evaluation.
//!
//! Kernel errors are per pair: one failing cell of a kernel matrix never
//! poisons the others.

use miette::Diagnostic;
use thiserror::Error;

/// Errors produced by the kernel engine.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum KernelError {
    #[error("degenerate tree {tree}: self-similarity is {self_similarity}")]
    #[diagnostic(
        code(clirel::kernel::degenerate_tree),
        help(
            "The normalized tree kernel divides by each tree's self-similarity, \
             which is zero only for the empty tree. The sentence most likely failed \
             to parse; check the warnings emitted while loading parses."
        )
    )]
    DegenerateTree { tree: String, self_similarity: f64 },

    #[error("kernel value is not finite ({value})")]
    #[diagnostic(
        code(clirel::kernel::non_finite),
        help(
            "The tree kernel overflowed. This happens for very large trees with a \
             small decay; trim the trees first or raise beta."
        )
    )]
    NonFinite { value: f64 },

    #[error("invalid kernel parameter {name} = {value}")]
    #[diagnostic(
        code(clirel::kernel::invalid_parameter),
        help("alpha must lie in [0, 1]; beta must be finite and greater than zero.")
    )]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Result type for kernel operations.
pub type KernelResult<T> = std::result::Result<T, KernelError>;
