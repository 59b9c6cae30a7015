use std::time::Duration;

use httpmock::Method::*;
use k8s_openapi::api::core::v1::ServiceAccount;
use serde_json::json;

use super::*;
use crate::fake::FakeWatchSource;
use crate::index::label_index_name;

async fn wait_watching<K: Clone + Send + Sync + 'static>(fake: &FakeWatchSource<K>) {
    while !fake.is_watching() {
        tokio::task::yield_now().await;
    }
}

#[rstest]
#[tokio::test]
async fn test_manager_with_fake_source(many_service_accounts: Vec<ServiceAccount>) {
    let config: CacheConfig = serde_yaml::from_str("labelIndices: [env]").unwrap();
    let fake = FakeWatchSource::new(many_service_accounts);

    let mut manager = CacheManager::<ServiceAccount>::start_with_source("ServiceAccount", Arc::new(fake.clone()), &config).unwrap();
    wait_watching(&fake).await;
    fake.relist().unwrap();
    assert!(manager.wait_ready().await);

    // already synced, so this returns right away
    assert!(manager.wait_ready().await);

    let lister = manager.lister();
    assert_eq!(lister.kind(), "ServiceAccount");
    let prod = lister.by_index(&label_index_name(TEST_LABEL_KEY), "prod").unwrap();
    assert_bag_eq!(names(&prod), ["sa1", "sa4", "sa5", "sa8"].map(String::from));

    manager.shutdown().await;

    // listers outlive the synchronizer; they just stop seeing updates
    assert_len_eq_x!(lister.namespaced(TEST_NAMESPACE).list(&kc_core::k8s::Everything).unwrap(), 6);
    assert_eq!(manager.store().len(), 12);
}

#[rstest]
#[tokio::test]
async fn test_manager_never_ready() {
    let fake = FakeWatchSource::<ServiceAccount>::default();
    let mut manager =
        CacheManager::<ServiceAccount>::start_with_source("ServiceAccount", Arc::new(fake.clone()), &CacheConfig::default()).unwrap();

    wait_watching(&fake).await;
    fake.close();
    assert!(!manager.wait_ready().await);
    assert!(!manager.store().has_synced());
}

#[rstest]
#[tokio::test]
async fn test_manager_bad_config() {
    let config = CacheConfig { resync_period: Some("0s".into()), ..Default::default() };
    let fake = FakeWatchSource::<ServiceAccount>::default();
    assert!(CacheManager::<ServiceAccount>::start_with_source("ServiceAccount", Arc::new(fake), &config).is_err());
}

#[rstest]
#[tokio::test]
async fn test_manager_start_wait_ready(test_service_account: ServiceAccount) {
    let config: CacheConfig = serde_yaml::from_str("labelSelector: env=prod").unwrap();
    let (mut fake_apiserver, client) = make_fake_apiserver();

    // The limit query param indicates this is the initial "list" call
    let sa = serde_json::to_value(&test_service_account).unwrap();
    fake_apiserver.handle(move |when, then| {
        when.path("/api/v1/serviceaccounts")
            .method(GET)
            .query_param("limit", "500")
            .query_param("labelSelector", "env=prod");
        then.json_body(list_body("v1", json!([sa.clone()])));
    });
    fake_apiserver.build();

    // The fake apiserver doesn't have anything useful to say in response to the watch call, but
    // errors after the initial list are handled by the watcher and don't affect readiness.
    let mut manager = CacheManager::<ServiceAccount>::start(client, &config).unwrap();
    let ready = tokio::time::timeout(Duration::from_secs(10), manager.wait_ready()).await.unwrap();
    assert!(ready);

    let got = manager
        .lister()
        .namespaced(TEST_NAMESPACE)
        .get(TEST_SERVICE_ACCOUNT)
        .unwrap();
    assert_eq!(got.as_ref(), &test_service_account);

    manager.shutdown().await;
    fake_apiserver.assert();
}
