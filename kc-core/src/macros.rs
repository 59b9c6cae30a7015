// Build an Option<BTreeMap<String, String>> out of "key" => "value" pairs; this is the shape
// that metav1::ObjectMeta uses for labels and annotations.
#[macro_export]
macro_rules! klabel {
    ($($key:expr => $val:expr),+ $(,)?) => {
        Some(std::collections::BTreeMap::from([$(($key.to_string(), $val.to_string())),+]))
    };
}

pub use klabel;
