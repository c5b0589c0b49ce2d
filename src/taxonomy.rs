//! Event taxonomy: background plus the ILAE seizure subtypes.
//!
//! The set is closed and fixed at compile time. `build.rs` reads the
//! declarative source `taxonomy/events.json` (short code → label) and emits
//! two enums:
//!
//! * [`SeizureType`]: every level except `bckg`;
//! * [`EventType`]: `bckg` followed by every [`SeizureType`].
//!
//! Codes outside the taxonomy never coerce to a member; parsing them fails
//! with [`Error::UnknownEventType`].
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

include!(concat!(env!("OUT_DIR"), "/taxonomy.rs"));

/// The declarative taxonomy source, verbatim. Suitable as an `events.json`
/// sidecar next to annotation files.
pub const EVENTS_JSON: &str = include_str!("../taxonomy/events.json");

/// `true` when `event` is a seizure subtype (anything but background).
pub fn is_seizure(event: EventType) -> bool {
    event.seizure_type().is_some()
}

impl EventType {
    /// Background class.
    pub const BACKGROUND: EventType = EventType::Bckg;

    /// Shorthand for [`is_seizure`].
    pub fn is_seizure(self) -> bool {
        is_seizure(self)
    }
}

impl SeizureType {
    /// Catch-all "seizure of unspecified type".
    pub const UNSPECIFIED: SeizureType = SeizureType::Sz;
}

impl TryFrom<EventType> for SeizureType {
    type Error = Error;

    fn try_from(event: EventType) -> Result<Self> {
        event
            .seizure_type()
            .ok_or_else(|| Error::UnknownEventType(event.code().to_string()))
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        EventType::from_code(code).ok_or_else(|| Error::UnknownEventType(code.to_string()))
    }
}

impl FromStr for SeizureType {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        SeizureType::from_code(code).ok_or_else(|| Error::UnknownEventType(code.to_string()))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for SeizureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_first_and_not_a_seizure() {
        assert_eq!(EventType::ALL[0], EventType::Bckg);
        assert!(!is_seizure(EventType::Bckg));
        assert_eq!(EventType::ALL.len(), SeizureType::ALL.len() + 1);
    }

    #[test]
    fn every_seizure_type_is_a_seizure_event() {
        for sz in SeizureType::ALL {
            let ev = EventType::from(sz);
            assert!(ev.is_seizure());
            assert_eq!(ev.code(), sz.code());
            assert_eq!(SeizureType::try_from(ev).unwrap(), sz);
        }
    }

    #[test]
    fn codes_round_trip() {
        for ev in EventType::ALL {
            assert_eq!(ev.code().parse::<EventType>().unwrap(), ev);
        }
        assert_eq!("sz_foc_ia".parse::<EventType>().unwrap(), EventType::SzFocIa);
        assert_eq!("sz_gen_m_tonicClonic".parse::<EventType>().unwrap(), EventType::SzGenMTonicClonic);
    }

    #[test]
    fn unknown_codes_fail_loudly() {
        assert!(matches!("seiz".parse::<EventType>(), Err(Error::UnknownEventType(c)) if c == "seiz"));
        // Case matters: codes are exact.
        assert!("SZ".parse::<EventType>().is_err());
        assert!("bckg".parse::<SeizureType>().is_err());
        assert!(SeizureType::try_from(EventType::Bckg).is_err());
    }

    #[test]
    fn sidecar_matches_generated_enum() {
        let json: serde_json::Value = serde_json::from_str(EVENTS_JSON).unwrap();
        let levels = json["Levels"].as_object().unwrap();
        assert_eq!(levels.len(), EventType::ALL.len());
        for (code, label) in levels {
            let ev: EventType = code.parse().unwrap();
            assert_eq!(ev.description(), label.as_str().unwrap());
        }
    }

    #[test]
    fn serde_uses_short_codes() {
        let s = serde_json::to_string(&EventType::SzFocF2b).unwrap();
        assert_eq!(s, "\"sz_foc_f2b\"");
        let back: EventType = serde_json::from_str(&s).unwrap();
        assert_eq!(back, EventType::SzFocF2b);
        assert!(serde_json::from_str::<EventType>("\"nope\"").is_err());
    }
}
