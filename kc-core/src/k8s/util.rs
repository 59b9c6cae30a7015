use kube::api::Resource;

use super::*;

pub fn format_key(namespace: &str, name: &str) -> String {
    if namespace.is_empty() { name.into() } else { format!("{namespace}/{name}") }
}

impl<T: Resource> KubeResourceExt for T {
    fn namespaced_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format_key(&ns, &self.name_any()),
            None => self.name_any(),
        }
    }
}
