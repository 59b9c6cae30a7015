mod manager_test;

use std::sync::Arc;

use assertables::*;
use kc_core::prelude::*;
use kc_testutils::*;
use tracing_test::traced_test;

use super::*;

fn names<K: Resource>(objs: &[Arc<K>]) -> Vec<String> {
    objs.iter().map(|o| o.name_any()).collect()
}
