pub const TEST_NAMESPACE: &str = "test-namespace";
pub const TEST_OTHER_NAMESPACE: &str = "other-namespace";
pub const TEST_SERVICE_ACCOUNT: &str = "the-service-account";
pub const TEST_CONFIG_MAP: &str = "the-config-map";
pub const TEST_LABEL_KEY: &str = "env";
