//! Process-wide group registry.
//!
//! Transports route `<base>/<group>/<key>` requests by group name; this
//! registry is where they look the name up. Registration is explicit —
//! building a [`Group`] does not register it.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::group::Group;

static GROUPS: Lazy<RwLock<HashMap<String, Arc<Group>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Register `group` under its name. Returns `false` (and leaves the
/// existing registration in place) when the name is already taken.
pub fn register(group: Arc<Group>) -> bool {
    let mut groups = GROUPS.write();
    match groups.entry(group.name().to_string()) {
        std::collections::hash_map::Entry::Occupied(_) => false,
        std::collections::hash_map::Entry::Vacant(slot) => {
            slot.insert(group);
            true
        }
    }
}

/// Look up a registered group by name.
pub fn get(name: &str) -> Option<Arc<Group>> {
    GROUPS.read().get(name).cloned()
}

/// Remove a group from the registry, returning it if it was registered.
pub fn deregister(name: &str) -> Option<Arc<Group>> {
    GROUPS.write().remove(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use bytestr::ByteStr;

    fn group(name: &str) -> Arc<Group> {
        Arc::new(
            Group::builder(name)
                .getter(|k: &ByteStr| -> Result<ByteStr, BoxError> { Ok(k.clone()) })
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_register_get_deregister() {
        let name = "registry-test-basic";
        assert!(get(name).is_none());

        let g = group(name);
        assert!(register(Arc::clone(&g)));
        assert!(Arc::ptr_eq(&get(name).unwrap(), &g));

        assert!(deregister(name).is_some());
        assert!(get(name).is_none());
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let name = "registry-test-duplicate";
        let first = group(name);
        let second = group(name);

        assert!(register(Arc::clone(&first)));
        assert!(!register(second));
        // The original registration survives.
        assert!(Arc::ptr_eq(&get(name).unwrap(), &first));

        deregister(name);
    }
}
