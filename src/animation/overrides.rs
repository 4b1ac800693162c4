//! One-shot values the emotion director pre-loads for gaze and blink

use crate::mapping::events::GazeDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearPolicy {
    /// A consumed value is gone
    #[default]
    ClearOnRead,
    /// A consumed value stays until replaced or cleared. The emotion
    /// director clears everything when it selects a behavior, so values last
    /// for the whole behavior: a forced blink fires again every time the lid
    /// may close, and the eye does not rest open until the behavior changes.
    Persist,
}

impl ClearPolicy {
    pub fn from_flag(clear_on_read: bool) -> Self {
        if clear_on_read {
            ClearPolicy::ClearOnRead
        } else {
            ClearPolicy::Persist
        }
    }
}

/// Single-writer slot read by exactly one consumer
#[derive(Debug, Clone)]
pub struct OverrideSlot<T> {
    value: Option<T>,
    policy: ClearPolicy,
}

impl<T: Clone> OverrideSlot<T> {
    pub fn new(policy: ClearPolicy) -> Self {
        Self {
            value: None,
            policy,
        }
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    pub fn consume(&mut self) -> Option<T> {
        match self.policy {
            ClearPolicy::ClearOnRead => self.value.take(),
            ClearPolicy::Persist => self.value.clone(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

#[derive(Debug, Clone)]
pub struct Overrides {
    pub move_duration: OverrideSlot<f64>,
    pub hold_duration: OverrideSlot<f64>,
    pub gaze_direction: OverrideSlot<GazeDirection>,
    pub blink_close_duration: OverrideSlot<f64>,
    policy: ClearPolicy,
}

impl Overrides {
    pub fn new(policy: ClearPolicy) -> Self {
        Self {
            move_duration: OverrideSlot::new(policy),
            hold_duration: OverrideSlot::new(policy),
            gaze_direction: OverrideSlot::new(policy),
            blink_close_duration: OverrideSlot::new(policy),
            policy,
        }
    }

    pub fn policy(&self) -> ClearPolicy {
        self.policy
    }

    pub fn clear_all(&mut self) {
        self.move_duration.clear();
        self.hold_duration.clear();
        self.gaze_direction.clear();
        self.blink_close_duration.clear();
    }
}

impl Default for Overrides {
    fn default() -> Self {
        Self::new(ClearPolicy::default())
    }
}
