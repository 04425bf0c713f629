//! `SystemTime` as whole seconds since the unix epoch.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serializer, ser::Error as _};

pub fn serialize<S: Serializer>(at: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
    match at.duration_since(UNIX_EPOCH) {
        Ok(d) => s.serialize_u64(d.as_secs()),
        Err(_) => Err(S::Error::custom("timestamp before unix epoch")),
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
    u64::deserialize(d).map(|secs| UNIX_EPOCH + Duration::from_secs(secs))
}
