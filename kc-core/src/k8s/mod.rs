mod selector;
mod util;

use std::collections::BTreeMap;

pub use selector::*;
pub use util::*;

use crate::errors::*;
use crate::prelude::*;

err_impl! {KubernetesError,
    #[error("malformed label selector: {0:?}")]
    MalformedLabelSelector(metav1::LabelSelectorRequirement),

    #[error("unknown label selector operator: {0}")]
    UnknownSelectorOperator(String),
}

pub trait KubeResourceExt {
    // The cache key for an object: "namespace/name", or just "name" if the object is
    // cluster-scoped.
    fn namespaced_name(&self) -> String;
}

// Anything that can decide whether a label set is selected.  The cache never parses selectors
// itself; callers bring whichever flavor they already have.
pub trait LabelMatcher {
    fn matches(&self, labels: &BTreeMap<String, String>) -> anyhow::Result<bool>;
}

#[cfg(test)]
pub mod tests;
