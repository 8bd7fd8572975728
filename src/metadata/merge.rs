//! Layering of metadata documents.
//!
//! A profile is built by stacking its documents: files read later sit on top of
//! files read earlier, and the `default` profile sits under every other profile.
//! [`deep_merge`] puts one layer on top of another.

use serde_json::Value;

/// Put `overlay` on top of `base`.
///
/// Sections present in both layers (`engine`, `providers.<alias>`, ...) are
/// combined key by key, at any depth. A sequence such as `submit.jars` is a
/// single setting, so the upper layer's list wins as a whole. A key the upper
/// layer leaves empty (`master:` with no value) stays as the lower layer had it.
///
/// ```
/// use serde_json::json;
/// use datalab_metadata::metadata::deep_merge;
///
/// let default = json!({
///     "engine": { "type": "spark", "master": "local[*]", "jobname": "etl" },
///     "jars": ["a.jar", "b.jar"]
/// });
/// let prod = json!({
///     "engine": { "master": "yarn", "jobname": null },
///     "jars": ["c.jar"]
/// });
/// assert_eq!(deep_merge(default, prod), json!({
///     "engine": { "type": "spark", "master": "yarn", "jobname": "etl" },
///     "jars": ["c.jar"]
/// }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                // in place, so a key keeps the position of its first layer
                if let Some(slot) = base_map.get_mut(&key) {
                    *slot = deep_merge(std::mem::take(slot), overlay_value);
                } else {
                    base_map.insert(key, overlay_value);
                }
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Stack layers bottom to top; an empty iterator yields null.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
