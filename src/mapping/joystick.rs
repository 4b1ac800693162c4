//! Gamepad → canonical event normalization

use crate::controller::{ButtonState, ButtonType, HatDirection, RawDeviceEvent, StickAxis};
use crate::mapping::events::{CanonicalEvent, EventSource, GazeDirection, ProfileId};
use crate::mapping::normalizer::EventNormalizer;
use crate::mapping::MappingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const LOW_ZONE: f32 = 0.25;
const HIGH_ZONE: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisZone {
    Low,
    Neutral,
    High,
}

impl AxisZone {
    pub fn from_fraction(fraction: f32) -> Self {
        if fraction < LOW_ZONE {
            AxisZone::Low
        } else if fraction > HIGH_ZONE {
            AxisZone::High
        } else {
            AxisZone::Neutral
        }
    }

    fn component(self) -> i8 {
        match self {
            AxisZone::Low => -1,
            AxisZone::Neutral => 0,
            AxisZone::High => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Blink,
    CenterGaze,
    Context(ProfileId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub button: ButtonType,
    pub action: ButtonAction,
}

pub fn default_bindings() -> Vec<ButtonBinding> {
    vec![
        ButtonBinding {
            button: ButtonType::South,
            action: ButtonAction::Blink,
        },
        ButtonBinding {
            button: ButtonType::East,
            action: ButtonAction::CenterGaze,
        },
        ButtonBinding {
            button: ButtonType::Select,
            action: ButtonAction::Context(ProfileId::Dragon),
        },
        ButtonBinding {
            button: ButtonType::Start,
            action: ButtonAction::Context(ProfileId::Cyclops),
        },
        ButtonBinding {
            button: ButtonType::Mode,
            action: ButtonAction::Context(ProfileId::Hack),
        },
    ]
}

/// Stateful stick/hat/button normalizer.
///
/// Only the last emitted direction is remembered: a stick event for one axis
/// borrows the other axis's component from it, which is how "up" followed by
/// "right" becomes "northeast".
#[derive(Debug)]
pub struct DeviceNormalizer {
    bindings: HashMap<ButtonType, ButtonAction>,
    last_direction: Option<GazeDirection>,
}

impl DeviceNormalizer {
    pub fn new(bindings: &[ButtonBinding]) -> Result<Self, MappingError> {
        let mut table = HashMap::new();
        for binding in bindings {
            if table.insert(binding.button, binding.action).is_some() {
                return Err(MappingError::BindingError(format!(
                    "{:?} is bound more than once",
                    binding.button
                )));
            }
        }
        Ok(Self {
            bindings: table,
            last_direction: None,
        })
    }

    pub fn last_direction(&self) -> Option<GazeDirection> {
        self.last_direction
    }

    fn stick(&mut self, axis: StickAxis, fraction: f32, out: &mut Vec<CanonicalEvent>) {
        let zone = AxisZone::from_fraction(fraction).component();
        let (h, v) = self
            .last_direction
            .map(|direction| direction.components())
            .unwrap_or((0, 0));
        let (h, v) = match axis {
            StickAxis::X => (zone, v),
            StickAxis::Y => (h, zone),
        };

        let direction = GazeDirection::from_components(h, v);
        if direction != self.last_direction {
            if let Some(direction) = direction {
                out.push(CanonicalEvent::Gaze(direction));
            }
            self.last_direction = direction;
        }
    }

    fn button(&mut self, button: ButtonType, state: ButtonState, out: &mut Vec<CanonicalEvent>) {
        let Some(action) = self.bindings.get(&button).copied() else {
            debug!("Unbound button {:?} ignored", button);
            return;
        };

        match (action, state) {
            (ButtonAction::Blink, _) => out.push(CanonicalEvent::BlinkToggle),
            (ButtonAction::CenterGaze, ButtonState::Pressed) => {
                out.push(CanonicalEvent::Gaze(GazeDirection::Center))
            }
            (ButtonAction::Context(profile), ButtonState::Pressed) => {
                out.push(CanonicalEvent::ContextSwitch(profile))
            }
            (_, ButtonState::Released) => {}
        }
    }
}

impl Default for DeviceNormalizer {
    fn default() -> Self {
        Self {
            bindings: default_bindings()
                .into_iter()
                .map(|b| (b.button, b.action))
                .collect(),
            last_direction: None,
        }
    }
}

impl EventNormalizer for DeviceNormalizer {
    type Input = RawDeviceEvent;

    fn normalize(&mut self, input: &RawDeviceEvent, out: &mut Vec<CanonicalEvent>) {
        match input {
            RawDeviceEvent::StickMoved { axis, fraction, .. } => self.stick(*axis, *fraction, out),
            RawDeviceEvent::HatMoved { direction, .. } => match direction {
                HatDirection::Forward => out.push(CanonicalEvent::PupilWiden),
                HatDirection::Back => out.push(CanonicalEvent::PupilNarrow),
                _ => {}
            },
            RawDeviceEvent::ButtonEvent {
                button_type,
                button_state,
                ..
            } => self.button(*button_type, *button_state, out),
            RawDeviceEvent::Connected { name } => {
                info!("Device input available: {}", name);
                self.reset();
            }
            RawDeviceEvent::Disconnected => {
                warn!("Device input lost, gaze falls back to network and autonomous sources");
                self.reset();
            }
        }
    }

    fn source(&self) -> EventSource {
        EventSource::Device
    }

    fn reset(&mut self) {
        self.last_direction = None;
    }
}
