use std::collections::BTreeMap;

use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use rstest::fixture;

use crate::constants::*;

fn build_meta(namespace: Option<&str>, name: &str, uid: &str, labels: &[(&str, &str)]) -> metav1::ObjectMeta {
    metav1::ObjectMeta {
        namespace: namespace.map(|ns| ns.into()),
        name: Some(name.into()),
        uid: Some(uid.into()),
        labels: if labels.is_empty() {
            None
        } else {
            Some(labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>())
        },
        ..Default::default()
    }
}

pub fn build_service_account(namespace: &str, name: &str, uid: &str, labels: &[(&str, &str)]) -> corev1::ServiceAccount {
    corev1::ServiceAccount {
        metadata: build_meta(Some(namespace), name, uid, labels),
        ..Default::default()
    }
}

pub fn build_config_map(namespace: &str, name: &str, uid: &str, data: &[(&str, &str)]) -> corev1::ConfigMap {
    corev1::ConfigMap {
        metadata: build_meta(Some(namespace), name, uid, &[]),
        data: Some(data.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
        ..Default::default()
    }
}

pub fn build_namespace(name: &str, uid: &str) -> corev1::Namespace {
    corev1::Namespace {
        metadata: build_meta(None, name, uid, &[]),
        ..Default::default()
    }
}

#[fixture]
pub fn test_service_account(#[default(TEST_SERVICE_ACCOUNT)] name: &str) -> corev1::ServiceAccount {
    build_service_account(TEST_NAMESPACE, name, &format!("{name}-uid"), &[(TEST_LABEL_KEY, "prod")])
}

#[fixture]
pub fn test_config_map(#[default(TEST_CONFIG_MAP)] name: &str) -> corev1::ConfigMap {
    build_config_map(TEST_NAMESPACE, name, &format!("{name}-uid"), &[("foo", "bar")])
}

// Two service accounts in the same namespace, one labelled for prod and one for dev
#[fixture]
pub fn prod_and_dev() -> (corev1::ServiceAccount, corev1::ServiceAccount) {
    (
        build_service_account("default", "A", "u1", &[(TEST_LABEL_KEY, "prod")]),
        build_service_account("default", "B", "u2", &[(TEST_LABEL_KEY, "dev")]),
    )
}

// A spread of service accounts across two namespaces with assorted labels; every third one has
// no labels at all.
#[fixture]
pub fn many_service_accounts() -> Vec<corev1::ServiceAccount> {
    (0..12)
        .map(|i| {
            let ns = if i % 2 == 0 { TEST_NAMESPACE } else { TEST_OTHER_NAMESPACE };
            let env = if i % 4 < 2 { "prod" } else { "dev" };
            let labels: &[(&str, &str)] = if i % 3 == 0 { &[] } else { &[(TEST_LABEL_KEY, env)] };
            build_service_account(ns, &format!("sa{i}"), &format!("uid{i}"), labels)
        })
        .collect()
}
