//! Composite kernel for relation classification.
//!
//! Two signals are blended:
//!
//! - a **convolution tree kernel** counting the tree fragments two parses
//!   share, with fragments rooted deeper in a match weighted down by
//!   `beta^-depth`, normalized by each tree's self-similarity;
//! - an **entity kernel** counting how many entity positions agree on type,
//!   expanded as the polynomial `(1 + k)^2 / 9`.
//!
//! ```text
//! K(E1, E2) = alpha * (1 + K_L)^2 / 9
//!           + (1 - alpha) * K_T(T1, T2) / sqrt(K_T(T1, T1) * K_T(T2, T2))
//! ```
//!
//! The engine is stateless beyond its [`KernelParams`]; every function takes
//! shared references and can be called from many threads at once.

pub mod error;
pub mod gram;

use serde::{Deserialize, Serialize};

use crate::relation::{EntityPair, EntityType, RelationResult};
use crate::tree::{Node, ParseTree};

pub use error::{KernelError, KernelResult};
pub use gram::{KernelMatrix, gram_matrix};

/// Default fragment decay: Euler's number.
pub const DEFAULT_BETA: f64 = std::f64::consts::E;
/// Default weight of the entity kernel in the blend.
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Run-wide kernel constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelParams {
    /// Linear-combination weight of the entity kernel, in `[0, 1]`.
    pub alpha: f64,
    /// Decay base for deep fragments, `> 0`.
    pub beta: f64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
        }
    }
}

impl KernelParams {
    pub fn new(alpha: f64, beta: f64) -> KernelResult<Self> {
        let params = Self { alpha, beta };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(KernelError::InvalidParameter {
                name: "alpha",
                value: self.alpha,
            });
        }
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(KernelError::InvalidParameter {
                name: "beta",
                value: self.beta,
            });
        }
        Ok(())
    }
}

/// What the composite kernel sees of one relation instance: its (enriched)
/// tree and its entity types.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelInput {
    tree: ParseTree,
    pair: EntityPair,
}

impl KernelInput {
    pub fn new(tree: ParseTree, pair: EntityPair) -> Self {
        Self { tree, pair }
    }

    /// Build from raw entity types, rejecting combinations that cannot
    /// hold a relation.
    pub fn from_types(tree: ParseTree, first: EntityType, second: EntityType) -> RelationResult<Self> {
        Ok(Self::new(tree, EntityPair::new(first, second)?))
    }

    pub fn tree(&self) -> &ParseTree {
        &self.tree
    }

    pub fn pair(&self) -> EntityPair {
        self.pair
    }
}

/// Number of positions at which two relation instances agree on entity type.
///
/// Compares first with first and second with second only; entity order is
/// assumed to be canonical already.
pub fn entity_kernel(a: EntityPair, b: EntityPair) -> u8 {
    u8::from(a.first() == b.first()) + u8::from(a.second() == b.second())
}

/// The composite tree + entity kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeKernel {
    params: KernelParams,
}

impl CompositeKernel {
    pub fn new(params: KernelParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> KernelParams {
        self.params
    }

    /// Decayed count of common fragments rooted at `n1` and `n2`.
    ///
    /// Zero unless the productions match; one for matching preterminals;
    /// otherwise `beta^-depth * prod(1 + C(child1_i, child2_i, depth + 1))`.
    pub fn fragment_count(&self, n1: &Node, n2: &Node, depth: u32) -> f64 {
        if n1.production() != n2.production() {
            return 0.0;
        }
        if n1.is_preterminal() && n2.is_preterminal() {
            return 1.0;
        }
        let product: f64 = n1
            .children()
            .iter()
            .zip(n2.children())
            .map(|(c1, c2)| 1.0 + self.fragment_count(c1, c2, depth + 1))
            .product();
        self.decay(depth) * product
    }

    fn decay(&self, depth: u32) -> f64 {
        match i32::try_from(depth) {
            Ok(d) => self.params.beta.powi(-d),
            Err(_) => self.params.beta.powf(-f64::from(depth)),
        }
    }

    /// Convolution kernel over two subtrees: fragments shared at the roots
    /// plus, unless either root is a preterminal, the kernel over every pair
    /// of their children.
    pub fn node_kernel(&self, t1: &Node, t2: &Node) -> f64 {
        let mut total = self.fragment_count(t1, t2, 0);
        if t1.is_preterminal() || t2.is_preterminal() {
            return total;
        }
        for c1 in t1.children() {
            for c2 in t2.children() {
                total += self.node_kernel(c1, c2);
            }
        }
        total
    }

    /// Convolution tree kernel; zero if either tree is empty.
    pub fn tree_kernel(&self, t1: &ParseTree, t2: &ParseTree) -> f64 {
        match (t1.root(), t2.root()) {
            (Some(a), Some(b)) => self.node_kernel(a, b),
            _ => 0.0,
        }
    }

    /// `K_T(T, T)`, strictly positive for every non-empty tree.
    pub fn self_similarity(&self, tree: &ParseTree) -> f64 {
        self.tree_kernel(tree, tree)
    }

    /// Composite kernel value for two relation instances.
    pub fn composite(&self, e1: &KernelInput, e2: &KernelInput) -> KernelResult<f64> {
        let k11 = self.self_similarity(e1.tree());
        let k22 = self.self_similarity(e2.tree());
        self.composite_with_norms(e1, e2, k11, k22)
    }

    /// Composite kernel given precomputed self-similarities.
    pub(crate) fn composite_with_norms(
        &self,
        e1: &KernelInput,
        e2: &KernelInput,
        k11: f64,
        k22: f64,
    ) -> KernelResult<f64> {
        for (input, norm) in [(e1, k11), (e2, k22)] {
            if norm <= 0.0 {
                return Err(KernelError::DegenerateTree {
                    tree: input.tree().to_string(),
                    self_similarity: norm,
                });
            }
        }

        let alpha = self.params.alpha;
        let entity = f64::from(entity_kernel(e1.pair(), e2.pair()));
        let entity_term = (1.0 + entity).powi(2) / 9.0;
        let tree_term = self.tree_kernel(e1.tree(), e2.tree()) / (k11 * k22).sqrt();

        let value = alpha * entity_term + (1.0 - alpha) * tree_term;
        if !value.is_finite() {
            return Err(KernelError::NonFinite { value });
        }
        Ok(value)
    }
}
