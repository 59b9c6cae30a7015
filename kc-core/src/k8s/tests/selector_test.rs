use std::collections::BTreeMap;

use assertables::*;
use kube::core::{
    Expression,
    Selector,
};

use super::*;

fn labels() -> BTreeMap<String, String> {
    klabel!("foo" => "bar").unwrap()
}

fn build_label_sel(key: &str, op: &str, value: Option<&str>) -> metav1::LabelSelector {
    metav1::LabelSelector {
        match_expressions: Some(vec![metav1::LabelSelectorRequirement {
            key: key.into(),
            operator: op.into(),
            values: value.map(|s| vec![s.into()]),
        }]),
        ..Default::default()
    }
}

#[rstest]
fn test_everything() {
    assert!(Everything.matches(&BTreeMap::new()).unwrap());
    assert!(Everything.matches(&labels()).unwrap());
}

#[rstest]
#[case::eq(Expression::Equal("foo".into(), "bar".into()), true)]
#[case::neq(Expression::NotEqual("foo".into(), "bar".into()), false)]
#[case::exists(Expression::Exists("baz".into()), false)]
#[case::does_not_exist(Expression::DoesNotExist("baz".into()), true)]
fn test_kube_selector(#[case] expr: Expression, #[case] expected: bool) {
    let sel: Selector = expr.into();
    assert_eq!(LabelMatcher::matches(&sel, &labels()).unwrap(), expected);
}

#[rstest]
fn test_kube_selector_empty_selects_all() {
    let sel = Selector::default();
    assert!(LabelMatcher::matches(&sel, &BTreeMap::new()).unwrap());
}

#[rstest]
#[case::op_in(OPERATOR_IN)]
#[case::op_not_in(OPERATOR_NOT_IN)]
fn test_label_expr_match(#[case] op: &str) {
    let sel = build_label_sel("foo", op, Some("bar"));
    let res = sel.matches(&labels()).unwrap();
    assert_eq!(res, op == OPERATOR_IN);
}

#[rstest]
#[case::op_in(OPERATOR_IN)]
#[case::op_not_in(OPERATOR_NOT_IN)]
fn test_label_expr_no_values(#[case] op: &str) {
    let sel = build_label_sel("foo", op, None);
    let res = sel.matches(&labels()).unwrap_err().downcast().unwrap();
    assert!(matches!(res, KubernetesError::MalformedLabelSelector(_)));
}

#[rstest]
#[case::op_in(OPERATOR_IN)]
#[case::op_not_in(OPERATOR_NOT_IN)]
fn test_label_expr_no_match(#[case] op: &str) {
    let sel = build_label_sel("baz", op, Some("qux"));
    let res = sel.matches(&labels()).unwrap();
    assert_eq!(res, op == OPERATOR_NOT_IN);
}

#[rstest]
#[case::op_exists(OPERATOR_EXISTS)]
#[case::op_not_exists(OPERATOR_DOES_NOT_EXIST)]
fn test_label_expr_exists(#[case] op: &str) {
    let sel = build_label_sel("foo", op, None);
    let res = sel.matches(&labels()).unwrap();
    assert_eq!(res, op == OPERATOR_EXISTS);
}

#[rstest]
#[case::op_exists(OPERATOR_EXISTS)]
#[case::op_not_exists(OPERATOR_DOES_NOT_EXIST)]
fn test_label_expr_exists_values(#[case] op: &str) {
    let sel = build_label_sel("foo", op, Some("bar"));
    let res = sel.matches(&labels()).unwrap_err().downcast().unwrap();
    assert!(matches!(res, KubernetesError::MalformedLabelSelector(_)));
}

#[rstest]
fn test_label_expr_unknown_operator() {
    let sel = build_label_sel("foo", "Sometimes", Some("bar"));
    let res = sel.matches(&labels()).unwrap_err().downcast().unwrap();
    assert!(matches!(res, KubernetesError::UnknownSelectorOperator(_)));
}

#[rstest]
#[case::label_match("foo".into())]
#[case::label_no_match("baz".into())]
fn test_label_match(#[case] label_key: String) {
    let sel = metav1::LabelSelector {
        match_labels: klabel!(label_key => "bar"),
        ..Default::default()
    };
    let res = sel.matches(&labels()).unwrap();
    assert_eq!(res, &label_key == "foo");
}

#[rstest]
fn test_empty_label_selector() {
    let sel = metav1::LabelSelector::default();
    assert_ok!(sel.matches(&BTreeMap::new()));
    assert!(sel.matches(&labels()).unwrap());
}

#[rstest]
fn test_matcher_by_ref() {
    let sel = build_label_sel("foo", OPERATOR_EXISTS, None);
    let by_ref = &&sel;
    assert!(by_ref.matches(&labels()).unwrap());
    assert_err!((&build_label_sel("foo", OPERATOR_EXISTS, Some("bar"))).matches(&labels()));
}
