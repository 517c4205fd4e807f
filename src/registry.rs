use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::zone::Zone;

/// UID-keyed zone lookup. Built once at configuration time; first
/// registration of a UID wins and later attempts are rejected.
pub(crate) struct ZoneRegistry {
    zones: HashMap<String, Zone>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self {
            zones: HashMap::new(),
        }
    }

    pub fn register(&mut self, zone: Zone) -> Result<()> {
        let uid = zone.uid().to_string();
        if self.zones.contains_key(&uid) {
            return Err(Error::DuplicateZone(uid));
        }
        self.zones.insert(uid, zone);
        Ok(())
    }

    pub fn get(&self, uid: &str) -> Option<&Zone> {
        self.zones.get(uid)
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Zone> {
        self.zones.get_mut(uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }
}
