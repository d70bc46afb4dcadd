//! Relation instances: two typed entities in one parsed sentence.
//!
//! Entity types come from a closed set (problem, treatment, test) and only
//! some ordered combinations form a relation candidate. Validation happens
//! when a pair is built, so everything downstream (enrichment, the entity
//! kernel, feature export) can rely on it.

use std::sync::Arc;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enrich::{self, EnrichmentMode, EntityMark};
use crate::kernel::KernelInput;
use crate::tree::{ParseTree, TokenSpan, TreeResult};

/// Errors from building relation instances.
#[derive(Debug, Error, Diagnostic)]
pub enum RelationError {
    #[error("invalid entity pair: {first} and {second}")]
    #[diagnostic(
        code(clirel::relation::invalid_pair),
        help(
            "Relations are only defined between a problem and a problem, treatment \
             or test. Treatment/test, test/test and treatment/treatment pairs \
             should be filtered out before kernel evaluation."
        )
    )]
    InvalidEntityPair { first: String, second: String },

    #[error("unknown entity type: \"{name}\"")]
    #[diagnostic(
        code(clirel::relation::unknown_entity_type),
        help("Valid entity types are: problem, treatment, test.")
    )]
    UnknownEntityType { name: String },

    #[error("unknown relation type: \"{name}\"")]
    #[diagnostic(
        code(clirel::relation::unknown_relation_type),
        help(
            "Valid relation types are: TrIP, TrWP, TrCP, TrAP, TrNAP, TeRP, TeCP, PIP, \
             NTrP, NTeP, NPP."
        )
    )]
    UnknownRelationType { name: String },
}

/// Result type for relation operations.
pub type RelationResult<T> = std::result::Result<T, RelationError>;

/// Medical concept category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Problem,
    Treatment,
    Test,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Problem => "problem",
            EntityType::Treatment => "treatment",
            EntityType::Test => "test",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = RelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "problem" => Ok(EntityType::Problem),
            "treatment" => Ok(EntityType::Treatment),
            "test" => Ok(EntityType::Test),
            _ => Err(RelationError::UnknownEntityType {
                name: s.to_string(),
            }),
        }
    }
}

/// An ordered pair of entity types that can hold a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityPair {
    first: EntityType,
    second: EntityType,
}

impl EntityPair {
    /// Validate an ordered type combination. At least one side must be a
    /// problem.
    pub fn new(first: EntityType, second: EntityType) -> RelationResult<Self> {
        use EntityType::*;
        match (first, second) {
            (Problem, _) | (_, Problem) => Ok(Self { first, second }),
            _ => Err(RelationError::InvalidEntityPair {
                first: first.to_string(),
                second: second.to_string(),
            }),
        }
    }

    pub fn first(&self) -> EntityType {
        self.first
    }

    pub fn second(&self) -> EntityType {
        self.second
    }

    /// The same pair with the entities swapped.
    pub fn swapped(&self) -> Self {
        Self {
            first: self.second,
            second: self.first,
        }
    }
}

/// Relation labels of the i2b2 clinical relation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// Treatment improves problem.
    TrIP,
    /// Treatment worsens problem.
    TrWP,
    /// Treatment causes problem.
    TrCP,
    /// Treatment administered for problem.
    TrAP,
    /// Treatment not administered because of problem.
    TrNAP,
    /// Test reveals problem.
    TeRP,
    /// Test conducted to investigate problem.
    TeCP,
    /// Problem indicates problem.
    PIP,
    /// No relation between a treatment and a problem.
    NTrP,
    /// No relation between a test and a problem.
    NTeP,
    /// No relation between two problems.
    NPP,
}

impl RelationType {
    pub const ALL: [RelationType; 11] = [
        RelationType::TrIP,
        RelationType::TrWP,
        RelationType::TrCP,
        RelationType::TrAP,
        RelationType::TrNAP,
        RelationType::TeRP,
        RelationType::TeCP,
        RelationType::PIP,
        RelationType::NTrP,
        RelationType::NTeP,
        RelationType::NPP,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::TrIP => "TrIP",
            RelationType::TrWP => "TrWP",
            RelationType::TrCP => "TrCP",
            RelationType::TrAP => "TrAP",
            RelationType::TrNAP => "TrNAP",
            RelationType::TeRP => "TeRP",
            RelationType::TeCP => "TeCP",
            RelationType::PIP => "PIP",
            RelationType::NTrP => "NTrP",
            RelationType::NTeP => "NTeP",
            RelationType::NPP => "NPP",
        }
    }

    /// Whether this label asserts an actual relation.
    pub fn is_positive(&self) -> bool {
        !matches!(
            self,
            RelationType::NTrP | RelationType::NTeP | RelationType::NPP
        )
    }

    /// The "no relation" label for an unannotated pair.
    pub fn negative_for(pair: EntityPair) -> RelationType {
        use EntityType::*;
        match (pair.first, pair.second) {
            (Treatment, _) | (_, Treatment) => RelationType::NTrP,
            (Test, _) | (_, Test) => RelationType::NTeP,
            (Problem, Problem) => RelationType::NPP,
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = RelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationType::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| RelationError::UnknownRelationType {
                name: s.to_string(),
            })
    }
}

/// A typed token range in a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySpan {
    #[serde(flatten)]
    pub span: TokenSpan,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, entity_type: EntityType) -> Self {
        Self {
            span: TokenSpan::new(start, end),
            entity_type,
        }
    }

    /// This entity marked with its type name, as used by enrichment.
    pub fn mark(&self) -> EntityMark<'static> {
        EntityMark::new(self.span, self.entity_type.as_str())
    }
}

/// Two entities in one sentence plus the sentence parse they share.
#[derive(Debug, Clone)]
pub struct RelationInstance {
    tree: Arc<ParseTree>,
    first: EntitySpan,
    second: EntitySpan,
    pair: EntityPair,
}

impl RelationInstance {
    pub fn new(tree: Arc<ParseTree>, first: EntitySpan, second: EntitySpan) -> RelationResult<Self> {
        let pair = EntityPair::new(first.entity_type, second.entity_type)?;
        Ok(Self {
            tree,
            first,
            second,
            pair,
        })
    }

    pub fn tree(&self) -> &ParseTree {
        &self.tree
    }

    pub fn first(&self) -> &EntitySpan {
        &self.first
    }

    pub fn second(&self) -> &EntitySpan {
        &self.second
    }

    pub fn pair(&self) -> EntityPair {
        self.pair
    }

    /// The same instance with the entity that starts first placed first.
    pub fn canonical(&self) -> Self {
        if self.second.span.start < self.first.span.start {
            Self {
                tree: Arc::clone(&self.tree),
                first: self.second,
                second: self.first,
                pair: self.pair.swapped(),
            }
        } else {
            self.clone()
        }
    }

    /// Label for this instance when no annotation covers it.
    pub fn negative_label(&self) -> RelationType {
        RelationType::negative_for(self.pair)
    }

    /// Enrich the shared parse for this instance's entities.
    pub fn enriched(&self, mode: EnrichmentMode) -> TreeResult<KernelInput> {
        let tree = enrich::enrich(&self.tree, mode, self.first.mark(), self.second.mark())?;
        Ok(KernelInput::new(tree, self.pair))
    }
}
