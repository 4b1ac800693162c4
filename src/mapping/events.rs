//! Canonical event vocabulary shared by every input source
//!
//! All device and network input is reduced to [`CanonicalEvent`] before it
//! reaches the arbiter. The string tokens (`eye_left`, `pupil_widen`,
//! `eye_context_dragon`, ...) are the same ones carried on the inter-eye
//! sync channel.

use crate::mapping::MappingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named art/geometry configuration the renderer can switch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileId {
    Cyclops,
    #[default]
    Dragon,
    Hack,
    Custom,
}

impl ProfileId {
    pub const ALL: [ProfileId; 4] = [
        ProfileId::Cyclops,
        ProfileId::Dragon,
        ProfileId::Hack,
        ProfileId::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cyclops => "cyclops",
            Self::Dragon => "dragon",
            Self::Hack => "hack",
            Self::Custom => "custom",
        }
    }

    /// Next profile in the demo rotation (cyclops → hack → dragon → cyclops).
    ///
    /// `Custom` is never entered by the rotation; leaving it starts over at cyclops.
    pub fn next_in_cycle(self) -> ProfileId {
        match self {
            Self::Cyclops => Self::Hack,
            Self::Hack => Self::Dragon,
            Self::Dragon => Self::Cyclops,
            Self::Custom => Self::Cyclops,
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileId {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileId::ALL
            .into_iter()
            .find(|profile| profile.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MappingError::UnknownProfile(s.to_string()))
    }
}

/// Compass direction for a requested gaze move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GazeDirection {
    Up,
    Down,
    Left,
    Right,
    Center,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl GazeDirection {
    pub const ALL: [GazeDirection; 9] = [
        GazeDirection::Up,
        GazeDirection::Down,
        GazeDirection::Left,
        GazeDirection::Right,
        GazeDirection::Center,
        GazeDirection::NorthEast,
        GazeDirection::NorthWest,
        GazeDirection::SouthEast,
        GazeDirection::SouthWest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "eye_up",
            Self::Down => "eye_down",
            Self::Left => "eye_left",
            Self::Right => "eye_right",
            Self::Center => "eye_center",
            Self::NorthEast => "eye_northeast",
            Self::NorthWest => "eye_northwest",
            Self::SouthEast => "eye_southeast",
            Self::SouthWest => "eye_southwest",
        }
    }

    /// Horizontal and vertical components, each in {-1, 0, 1} (right and up positive)
    pub fn components(&self) -> (i8, i8) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::Center => (0, 0),
            Self::NorthEast => (1, 1),
            Self::NorthWest => (-1, 1),
            Self::SouthEast => (1, -1),
            Self::SouthWest => (-1, -1),
        }
    }

    /// Inverse of [`GazeDirection::components`] for a deflected stick.
    ///
    /// Returns `None` for `(0, 0)`: a released stick is not a center request.
    pub fn from_components(horizontal: i8, vertical: i8) -> Option<GazeDirection> {
        match (horizontal.signum(), vertical.signum()) {
            (0, 0) => None,
            (0, 1) => Some(Self::Up),
            (0, -1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            (1, 1) => Some(Self::NorthEast),
            (-1, 1) => Some(Self::NorthWest),
            (1, -1) => Some(Self::SouthEast),
            (-1, -1) => Some(Self::SouthWest),
            _ => unreachable!("signum only yields -1, 0 or 1"),
        }
    }
}

/// Normalized, source-independent request for a gaze/pupil/blink/profile change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalEvent {
    Gaze(GazeDirection),
    PupilWiden,
    PupilNarrow,
    BlinkToggle,
    ContextSwitch(ProfileId),
}

const CONTEXT_PREFIX: &str = "eye_context_";

impl fmt::Display for CanonicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaze(direction) => f.write_str(direction.as_str()),
            Self::PupilWiden => f.write_str("pupil_widen"),
            Self::PupilNarrow => f.write_str("pupil_narrow"),
            Self::BlinkToggle => f.write_str("blink"),
            Self::ContextSwitch(profile) => write!(f, "{}{}", CONTEXT_PREFIX, profile),
        }
    }
}

impl FromStr for CanonicalEvent {
    type Err = MappingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if let Some(direction) = GazeDirection::ALL
            .into_iter()
            .find(|direction| direction.as_str() == token)
        {
            return Ok(Self::Gaze(direction));
        }

        match token {
            "pupil_widen" => Ok(Self::PupilWiden),
            "pupil_narrow" => Ok(Self::PupilNarrow),
            "blink" => Ok(Self::BlinkToggle),
            _ => match token.strip_prefix(CONTEXT_PREFIX) {
                Some(profile) => Ok(Self::ContextSwitch(profile.parse()?)),
                None => Err(MappingError::UnknownEvent(token.to_string())),
            },
        }
    }
}

/// Where a canonical event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    /// Locally attached joystick / gamepad
    Device,
    /// Wearables or inter-eye sync multicast feed
    Network,
}

impl EventSource {
    /// Sources in arbitration order, highest priority first
    pub const PRIORITY: [EventSource; 2] = [EventSource::Device, EventSource::Network];

    /// Position in [`EventSource::PRIORITY`]; lower wins
    pub fn rank(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|source| source == self)
            .unwrap_or(Self::PRIORITY.len())
    }
}
