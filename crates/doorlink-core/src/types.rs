use crate::{Result, constants::MAX_MODULE_ID_LEN, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Door module identifier (1-15 visible ASCII characters, e.g. `D1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleId(String);

impl ModuleId {
    /// Create a new module ID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidModuleId` if the ID is empty, longer than
    /// 15 characters, or contains whitespace or non-ASCII characters.
    pub fn new(id: &str) -> Result<Self> {
        if id.is_empty() || id.len() > MAX_MODULE_ID_LEN {
            return Err(Error::InvalidModuleId(format!(
                "Module ID must be 1-{MAX_MODULE_ID_LEN} chars, got {}",
                id.len()
            )));
        }

        if !id.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::InvalidModuleId(format!(
                "Module ID must be visible ASCII: {id:?}"
            )));
        }

        Ok(ModuleId(id.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ModuleId::new(s)
    }
}

impl TryFrom<String> for ModuleId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ModuleId::new(&value)
    }
}

impl From<ModuleId> for String {
    fn from(id: ModuleId) -> Self {
        id.0
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Physical channel of a door module.
///
/// `D0` is the primary door; `D1` is an optional second monitored point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    D0,
    D1,
}

impl Channel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::D0 => "D0",
            Channel::D1 => "D1",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "D0" => Ok(Channel::D0),
            "D1" => Ok(Channel::D1),
            other => Err(Error::invalid_format(format!("Unknown channel: {other}"))),
        }
    }
}

/// The observed point of a channel an EVENT refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Point {
    /// Door leaf position (distance sensor).
    Door,
    /// Bolt position (actuator).
    Lock,
}

impl Point {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Point::Door => "DOOR",
            Point::Lock => "LOCK",
        }
    }

    /// Whether `state` is a meaningful value for this point.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorlink_core::{Point, PointState};
    ///
    /// assert!(Point::Door.accepts(PointState::Open));
    /// assert!(!Point::Door.accepts(PointState::Locked));
    /// ```
    #[must_use]
    pub fn accepts(&self, state: PointState) -> bool {
        matches!(
            (self, state),
            (Point::Door, PointState::Open | PointState::Closed)
                | (Point::Lock, PointState::Locked | PointState::Unlocked)
        )
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Point {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DOOR" => Ok(Point::Door),
            "LOCK" => Ok(Point::Lock),
            other => Err(Error::invalid_format(format!("Unknown point: {other}"))),
        }
    }
}

/// Reported value of a [`Point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointState {
    Open,
    Closed,
    Locked,
    Unlocked,
}

impl PointState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PointState::Open => "OPEN",
            PointState::Closed => "CLOSED",
            PointState::Locked => "LOCKED",
            PointState::Unlocked => "UNLOCKED",
        }
    }

    #[must_use]
    pub fn door(open: bool) -> Self {
        if open {
            PointState::Open
        } else {
            PointState::Closed
        }
    }

    #[must_use]
    pub fn lock(locked: bool) -> Self {
        if locked {
            PointState::Locked
        } else {
            PointState::Unlocked
        }
    }
}

impl fmt::Display for PointState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(PointState::Open),
            "CLOSED" => Ok(PointState::Closed),
            "LOCKED" => Ok(PointState::Locked),
            "UNLOCKED" => Ok(PointState::Unlocked),
            other => Err(Error::invalid_format(format!("Unknown state: {other}"))),
        }
    }
}

/// Door state as maintained by a door module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DoorState {
    /// Sensor failure or not yet observed.
    #[default]
    Unknown,
    /// Door leaf away from the frame.
    Open,
    /// Door closed, bolt retracted.
    Unlocked,
    /// Door closed, bolt engaged.
    Locked,
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DoorState::Unknown => "UNKNOWN",
            DoorState::Open => "OPEN",
            DoorState::Unlocked => "UNLOCKED",
            DoorState::Locked => "LOCKED",
        };
        f.write_str(name)
    }
}

/// Distance reported by the door sensor, in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Centimeters(pub u32);

impl Centimeters {
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Centimeters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}cm", self.0)
    }
}

/// Actuator angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Degrees(pub u16);

impl Degrees {
    #[must_use]
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}deg", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("D1")]
    #[case("door-east-01")]
    #[case("ABCDEFGHIJKLMNO")]
    fn test_module_id_valid(#[case] raw: &str) {
        let id = ModuleId::new(raw).unwrap();
        assert_eq!(id.as_str(), raw);
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("ABCDEFGHIJKLMNOP")]
    #[case("D 1")]
    #[case("D\t1")]
    #[case("Dé")]
    fn test_module_id_invalid(#[case] raw: &str) {
        assert!(matches!(
            ModuleId::new(raw),
            Err(Error::InvalidModuleId(_))
        ));
    }

    #[test]
    fn test_module_id_serde_roundtrip() {
        let id = ModuleId::new("D7").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"D7\"");
        let back: ModuleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_module_id_serde_rejects_invalid() {
        let result: std::result::Result<ModuleId, _> = serde_json::from_str("\"has space\"");
        assert!(result.is_err());
    }

    #[rstest]
    #[case("D0", Channel::D0)]
    #[case("D1", Channel::D1)]
    fn test_channel_parse(#[case] raw: &str, #[case] expected: Channel) {
        assert_eq!(raw.parse::<Channel>().unwrap(), expected);
        assert_eq!(expected.as_str(), raw);
    }

    #[test]
    fn test_channel_parse_is_case_sensitive() {
        assert!("d0".parse::<Channel>().is_err());
        assert!("D2".parse::<Channel>().is_err());
    }

    #[rstest]
    #[case(Point::Door, PointState::Open, true)]
    #[case(Point::Door, PointState::Closed, true)]
    #[case(Point::Door, PointState::Locked, false)]
    #[case(Point::Door, PointState::Unlocked, false)]
    #[case(Point::Lock, PointState::Locked, true)]
    #[case(Point::Lock, PointState::Unlocked, true)]
    #[case(Point::Lock, PointState::Open, false)]
    #[case(Point::Lock, PointState::Closed, false)]
    fn test_point_accepts(#[case] point: Point, #[case] state: PointState, #[case] ok: bool) {
        assert_eq!(point.accepts(state), ok);
    }

    #[test]
    fn test_point_state_helpers() {
        assert_eq!(PointState::door(true), PointState::Open);
        assert_eq!(PointState::door(false), PointState::Closed);
        assert_eq!(PointState::lock(true), PointState::Locked);
        assert_eq!(PointState::lock(false), PointState::Unlocked);
    }

    #[test]
    fn test_door_state_default_is_unknown() {
        assert_eq!(DoorState::default(), DoorState::Unknown);
        assert_eq!(DoorState::Locked.to_string(), "LOCKED");
    }

    #[test]
    fn test_units_display() {
        assert_eq!(Centimeters(12).to_string(), "12cm");
        assert_eq!(Degrees(180).to_string(), "180deg");
        assert!(Centimeters(9) < Centimeters(10));
    }
}
