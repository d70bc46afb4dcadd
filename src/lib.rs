// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # clirel
//!
//! Syntactic tree kernels for clinical relation extraction.
//!
//! ## Architecture
//!
//! - **Trees** (`tree`): bracket-notation constituency parses, span location
//! - **Enrichment** (`enrich`): trim, insertion and suffixing rewrites
//! - **Kernels** (`kernel`): decayed convolution tree kernel blended with an
//!   entity-type kernel, parallel Gram matrices via `rayon`
//! - **Relations** (`relation`): typed entity spans and relation labels
//! - **Corpus** (`corpus`): per-document sentence parses owned by the caller
//! - **Export** (`export`): SVM-light-TK instance lines
//!
//! ## Library usage
//!
//! ```
//! use std::sync::Arc;
//! use clirel::enrich::EnrichmentMode;
//! use clirel::kernel::CompositeKernel;
//! use clirel::relation::{EntitySpan, EntityType, RelationInstance};
//! use clirel::tree::ParseTree;
//!
//! let tree = Arc::new(
//!     ParseTree::parse("(S (NP (NNP Aspirin)) (VP (VBD relieved) (NP (NN pain))))").unwrap(),
//! );
//! let instance = RelationInstance::new(
//!     tree,
//!     EntitySpan::new(0, 0, EntityType::Treatment),
//!     EntitySpan::new(2, 2, EntityType::Problem),
//! )
//! .unwrap();
//!
//! let input = instance.enriched(EnrichmentMode::Insert).unwrap();
//! let kernel = CompositeKernel::default();
//! let k = kernel.composite(&input, &input).unwrap();
//! assert!((k - 1.0).abs() < 1e-12);
//! ```

pub mod config;
pub mod corpus;
pub mod enrich;
pub mod error;
pub mod export;
pub mod kernel;
pub mod relation;
pub mod tree;
