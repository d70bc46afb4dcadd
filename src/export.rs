//! SVM-light-TK instance lines.
//!
//! The tree-kernel SVM reads one instance per line: an optional target, the
//! tree between `|BT|` and `|ET|`, then a sparse feature vector closed by
//! `|EV|`. Instances to classify carry no target and get their tree inside an
//! extra unlabeled bracket pair.
//!
//! ```text
//! 1 |BT| (VP (VBD relieved) (NP (NN pain))) |ET| 2:1 6:1 |EV|
//! |BT| ( (VP (VBD relieved) (NP (NN pain))) ) |ET| 2:1 6:1 |EV|
//! ```

use crate::relation::{EntityPair, EntityType};
use crate::tree::ParseTree;

fn slot(entity: EntityType) -> usize {
    match entity {
        EntityType::Test => 1,
        EntityType::Treatment => 2,
        EntityType::Problem => 3,
    }
}

/// Ordered two-hot encoding of an entity pair.
///
/// Slots 1 to 3 hold the first entity's type (test, treatment, problem),
/// slots 4 to 6 the second entity's.
pub fn entity_features(pair: EntityPair) -> String {
    format!("{}:1 {}:1", slot(pair.first()), slot(pair.second()) + 3)
}

/// Render one instance line. `target` is `None` for instances to classify.
pub fn instance_line(target: Option<bool>, tree: &ParseTree, features: &str) -> String {
    let mut out = String::new();
    match target {
        Some(true) => out.push_str("1 "),
        Some(false) => out.push_str("-1 "),
        None => {}
    }
    out.push_str("|BT| ");
    if target.is_none() {
        out.push_str("( ");
    }
    if !tree.is_empty() {
        out.push_str(&tree.to_string());
        out.push(' ');
    }
    if target.is_none() {
        out.push_str(") ");
    }
    out.push_str("|ET| ");
    out.push_str(features);
    out.push_str(" |EV|");
    out
}
