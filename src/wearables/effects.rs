//! Effect-name lookup for wearables datagrams

use crate::mapping::events::{CanonicalEvent, GazeDirection};
use crate::mapping::MappingError;

use GazeDirection::*;

const EFFECT_TABLE: &[(&str, &[GazeDirection])] = &[
    ("slowblink", &[Center]),
    ("radiaterainbow", &[Up]),
    ("rider", &[Left, Right]),
    ("threesine", &[NorthEast, NorthWest]),
    ("flame", &[Down, SouthWest]),
    ("glitter", &[SouthEast]),
];

/// Gaze directions requested by a wearable effect.
///
/// Canonical gaze tokens arriving on the sync channel resolve to themselves.
pub fn effect_directions(effect: &str) -> Result<Vec<GazeDirection>, MappingError> {
    if let Some((_, directions)) = EFFECT_TABLE.iter().find(|(name, _)| *name == effect) {
        return Ok(directions.to_vec());
    }

    match effect.parse::<CanonicalEvent>() {
        Ok(CanonicalEvent::Gaze(direction)) => Ok(vec![direction]),
        _ => Err(MappingError::UnmappedEffect(effect.to_string())),
    }
}

/// Same as [`effect_directions`] but accepts any canonical token, not only gaze.
pub fn effect_events(effect: &str) -> Result<Vec<CanonicalEvent>, MappingError> {
    match effect_directions(effect) {
        Ok(directions) => Ok(directions.into_iter().map(CanonicalEvent::Gaze).collect()),
        Err(_) => effect
            .parse::<CanonicalEvent>()
            .map(|event| vec![event])
            .map_err(|_| MappingError::UnmappedEffect(effect.to_string())),
    }
}
