// Well-known index names
pub const NAMESPACE_INDEX: &str = "namespace";
pub const UID_INDEX: &str = "uid";
pub const LABEL_INDEX_PREFIX: &str = "label:";

// The empty namespace means "every namespace", same as the apiserver
pub const NAMESPACE_ALL: &str = "";

// Metrics
pub const EVENTS_APPLIED_METRIC: &str = "kcache_events_applied_total";
pub const RELISTS_METRIC: &str = "kcache_relists_total";
pub const OBJECTS_GAUGE_METRIC: &str = "kcache_objects";
