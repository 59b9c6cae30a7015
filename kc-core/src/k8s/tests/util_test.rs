use super::*;

#[rstest]
#[case::namespaced("default", "foo", "default/foo")]
#[case::cluster_scoped("", "foo", "foo")]
fn test_format_key(#[case] ns: &str, #[case] name: &str, #[case] expected: &str) {
    assert_eq!(format_key(ns, name), expected);
}

#[rstest]
fn test_namespaced_name(test_service_account: corev1::ServiceAccount) {
    assert_eq!(test_service_account.namespaced_name(), format!("{TEST_NAMESPACE}/{TEST_SERVICE_ACCOUNT}"));
}

#[rstest]
fn test_namespaced_name_cluster_scoped() {
    let ns = build_namespace(TEST_NAMESPACE, "ns-uid");
    assert_eq!(ns.namespaced_name(), TEST_NAMESPACE);
}
