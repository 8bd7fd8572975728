//! Inheritance of default-profile keys into every other profile.

use super::DEFAULT_PROFILE;
use super::merge::deep_merge;
use super::reader::ProfileSet;
use serde_json::Value;

/// Make every profile inherit from the `default` profile.
///
/// See [`inherit_from`].
pub fn inherit(profiles: ProfileSet) -> ProfileSet {
    inherit_from(profiles, DEFAULT_PROFILE)
}

/// Make every profile inherit the top-level keys of `default_profile`.
///
/// For each top-level key of the default profile, every other profile's value
/// becomes `deep_merge(default_value, own_value)`, or the default value as-is
/// when the profile does not define the key. Values a profile already defines
/// always win. Profiles are never created, and a missing default profile leaves
/// the set unchanged.
pub fn inherit_from(mut profiles: ProfileSet, default_profile: &str) -> ProfileSet {
    let Some(Value::Object(defaults)) = profiles.get(default_profile).cloned() else {
        return profiles;
    };

    for (name, document) in profiles.iter_mut() {
        if name == default_profile {
            continue;
        }
        let Value::Object(map) = document else {
            continue;
        };

        for (key, default_value) in &defaults {
            match map.get_mut(key) {
                Some(slot) => {
                    let own = std::mem::take(slot);
                    *slot = deep_merge(default_value.clone(), own);
                }
                None => {
                    map.insert(key.clone(), default_value.clone());
                }
            }
        }
    }

    profiles
}
