use std::collections::BTreeMap;

use kube::core::{
    Selector,
    SelectorExt,
};

use super::*;

// The meanings of these operators is explained here:
// https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/#set-based-requirement
pub(super) const OPERATOR_IN: &str = "In";
pub(super) const OPERATOR_NOT_IN: &str = "NotIn";
pub(super) const OPERATOR_EXISTS: &str = "Exists";
pub(super) const OPERATOR_DOES_NOT_EXIST: &str = "DoesNotExist";

// Selects every object, including ones with no labels at all
#[derive(Clone, Copy, Debug, Default)]
pub struct Everything;

impl LabelMatcher for Everything {
    fn matches(&self, _labels: &BTreeMap<String, String>) -> anyhow::Result<bool> {
        Ok(true)
    }
}

impl LabelMatcher for Selector {
    fn matches(&self, labels: &BTreeMap<String, String>) -> anyhow::Result<bool> {
        Ok(SelectorExt::matches(self, labels))
    }
}

// A LabelSelector straight off of some object spec; unlike the kube-rs Selector it hasn't been
// validated, so a malformed requirement is reported as an error instead of silently not matching.
impl LabelMatcher for metav1::LabelSelector {
    fn matches(&self, labels: &BTreeMap<String, String>) -> anyhow::Result<bool> {
        if let Some(exprs) = &self.match_expressions {
            for expr in exprs {
                if !label_expr_match(labels, expr)? {
                    return Ok(false);
                }
            }
        }

        if let Some(match_labels) = &self.match_labels {
            for (k, v) in match_labels {
                if labels.get(k) != Some(v) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl<M: LabelMatcher + ?Sized> LabelMatcher for &M {
    fn matches(&self, labels: &BTreeMap<String, String>) -> anyhow::Result<bool> {
        (**self).matches(labels)
    }
}

fn label_expr_match(
    obj_labels: &BTreeMap<String, String>,
    expr: &metav1::LabelSelectorRequirement,
) -> anyhow::Result<bool> {
    // LabelSelectorRequirement is considered invalid if the Operator is "In" or NotIn"
    // and there are no values; conversely for "Exists" and "DoesNotExist".
    match expr.operator.as_str() {
        OPERATOR_IN => match obj_labels.get(&expr.key) {
            Some(v) => match &expr.values {
                Some(values) if !values.is_empty() => Ok(values.contains(v)),
                _ => bail!(KubernetesError::malformed_label_selector(expr)),
            },
            None => Ok(false),
        },
        OPERATOR_NOT_IN => match obj_labels.get(&expr.key) {
            Some(v) => match &expr.values {
                Some(values) if !values.is_empty() => Ok(!values.contains(v)),
                _ => bail!(KubernetesError::malformed_label_selector(expr)),
            },
            None => Ok(true),
        },
        OPERATOR_EXISTS => match &expr.values {
            Some(values) if !values.is_empty() => bail!(KubernetesError::malformed_label_selector(expr)),
            _ => Ok(obj_labels.contains_key(&expr.key)),
        },
        OPERATOR_DOES_NOT_EXIST => match &expr.values {
            Some(values) if !values.is_empty() => {
                bail!(KubernetesError::malformed_label_selector(expr));
            },
            _ => Ok(!obj_labels.contains_key(&expr.key)),
        },
        op => bail!(KubernetesError::unknown_selector_operator(op)),
    }
}
