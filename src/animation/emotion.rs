//! Emotion director
//!
//! Every `emotion.interval_sec` the director moves on to the next behavior in
//! a list that is reshuffled at the start of each cycle. A behavior returns an
//! optional pupil target and duration, and may pre-load one-shot
//! [`Overrides`] for the gaze and blink controllers. Angry keeps a small
//! sub-state and asks to be invoked again before the interval is over.

use super::overrides::{ClearPolicy, Overrides};
use super::{uniform, uniform_open};
use crate::config::{BehaviorKind, EyeConfig};
use crate::mapping::events::GazeDirection;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use tracing::{debug, info};

/// Values the behaviors read, copied out of the config once
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorSettings {
    pub pupil_min: f64,
    pub pupil_max: f64,
    pub pupil_move_sec: f64,
    pub staring_hold_sec: f64,
    pub angry_move_sec: f64,
    pub angry_step_sec: f64,
    pub angry_close_min_sec: f64,
    pub angry_close_max_sec: f64,
}

impl BehaviorSettings {
    pub fn from_config(config: &EyeConfig) -> Self {
        Self {
            pupil_min: config.pupil.min,
            pupil_max: config.pupil.max,
            pupil_move_sec: config.emotion.pupil_move_sec,
            staring_hold_sec: config.emotion.staring_hold_sec,
            angry_move_sec: config.emotion.angry_move_sec,
            angry_step_sec: config.emotion.angry_step_sec,
            angry_close_min_sec: config.blink.angry_duration_close_min_sec,
            angry_close_max_sec: config.blink.angry_duration_close_max_sec,
        }
    }

    /// Point at `fraction` of the way from min to max pupil scale
    fn pupil_at(&self, fraction: f64) -> f64 {
        self.pupil_min + (self.pupil_max - self.pupil_min) * fraction
    }

    fn pupil_between(&self, rng: &mut dyn RngCore, low: f64, high: f64) -> f64 {
        uniform(rng, self.pupil_at(low), self.pupil_at(high))
    }
}

pub struct BehaviorContext<'a> {
    pub settings: &'a BehaviorSettings,
    pub overrides: &'a mut Overrides,
    pub rng: &'a mut dyn RngCore,
}

/// What a behavior asks of the pupil. Both `None` means it only set overrides.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BehaviorOutput {
    pub pupil: Option<f64>,
    pub duration: Option<f64>,
    /// Invoke again after this long instead of waiting for the next behavior
    pub reinvoke_after: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngrySubstate {
    Focused,
    Alarmed,
}

pub trait Behavior: Send {
    fn kind(&self) -> BehaviorKind;

    fn invoke(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorOutput;

    fn angry_substate(&self) -> Option<AngrySubstate> {
        None
    }
}

struct Normal;

impl Behavior for Normal {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Normal
    }

    fn invoke(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorOutput {
        BehaviorOutput {
            pupil: Some(ctx.settings.pupil_between(ctx.rng, 0.3, 0.7)),
            duration: None,
            reinvoke_after: None,
        }
    }
}

struct DilatedPupil;

impl Behavior for DilatedPupil {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::DilatedPupil
    }

    fn invoke(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorOutput {
        BehaviorOutput {
            pupil: Some(ctx.settings.pupil_between(ctx.rng, 0.85, 1.0)),
            duration: Some(ctx.settings.pupil_move_sec),
            reinvoke_after: None,
        }
    }
}

struct SquintPupil;

impl Behavior for SquintPupil {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::SquintPupil
    }

    fn invoke(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorOutput {
        BehaviorOutput {
            pupil: Some(ctx.settings.pupil_between(ctx.rng, 0.0, 0.15)),
            duration: Some(ctx.settings.pupil_move_sec),
            reinvoke_after: None,
        }
    }
}

struct StaringAhead;

impl Behavior for StaringAhead {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::StaringAhead
    }

    fn invoke(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorOutput {
        ctx.overrides.gaze_direction.set(GazeDirection::Center);
        ctx.overrides.move_duration.set(ctx.settings.pupil_move_sec);
        ctx.overrides.hold_duration.set(ctx.settings.staring_hold_sec);
        BehaviorOutput::default()
    }
}

struct Angry {
    substate: AngrySubstate,
}

impl Behavior for Angry {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Angry
    }

    fn invoke(&mut self, ctx: &mut BehaviorContext<'_>) -> BehaviorOutput {
        let settings = ctx.settings;
        self.substate = if ctx.rng.gen_bool(0.5) {
            AngrySubstate::Focused
        } else {
            AngrySubstate::Alarmed
        };

        let close = uniform_open(
            ctx.rng,
            settings.angry_close_min_sec,
            settings.angry_close_max_sec,
        );
        ctx.overrides.blink_close_duration.set(close);

        let pupil = match self.substate {
            AngrySubstate::Focused => {
                ctx.overrides.gaze_direction.set(GazeDirection::Center);
                ctx.overrides.move_duration.set(settings.angry_move_sec);
                settings.pupil_between(ctx.rng, 0.0, 0.1)
            }
            AngrySubstate::Alarmed => {
                let side = if ctx.rng.gen_bool(0.5) {
                    GazeDirection::NorthEast
                } else {
                    GazeDirection::NorthWest
                };
                ctx.overrides.gaze_direction.set(side);
                ctx.overrides.move_duration.set(settings.angry_move_sec * 0.5);
                settings.pupil_between(ctx.rng, 0.9, 1.0)
            }
        };
        debug!("Angry {:?}, blink close {:.3}s", self.substate, close);

        BehaviorOutput {
            pupil: Some(pupil),
            duration: Some(settings.angry_move_sec),
            reinvoke_after: Some(settings.angry_step_sec),
        }
    }

    fn angry_substate(&self) -> Option<AngrySubstate> {
        Some(self.substate)
    }
}

fn build_behavior(kind: BehaviorKind) -> Box<dyn Behavior> {
    match kind {
        BehaviorKind::Normal => Box::new(Normal),
        BehaviorKind::DilatedPupil => Box::new(DilatedPupil),
        BehaviorKind::SquintPupil => Box::new(SquintPupil),
        BehaviorKind::Angry => Box::new(Angry {
            substate: AngrySubstate::Focused,
        }),
        BehaviorKind::StaringAhead => Box::new(StaringAhead),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionState {
    pub active: Option<BehaviorKind>,
    pub next_select_time: f64,
    pub angry_substate: Option<AngrySubstate>,
}

pub struct EmotionDirector {
    enabled: bool,
    interval: f64,
    settings: BehaviorSettings,
    behaviors: Vec<Box<dyn Behavior>>,
    order: Vec<usize>,
    /// Position in `order` of the next behavior to select
    next: usize,
    active: Option<usize>,
    cycle_deadline: f64,
    next_step_time: f64,
}

impl EmotionDirector {
    pub fn new(config: &EyeConfig, now: f64) -> Self {
        let mut kinds: Vec<BehaviorKind> = Vec::new();
        for kind in &config.emotion.behaviors {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        let behaviors: Vec<Box<dyn Behavior>> = kinds.into_iter().map(build_behavior).collect();
        let order: Vec<usize> = (0..behaviors.len()).collect();
        let interval = config.emotion.interval_sec;

        Self {
            enabled: config.emotion.enabled && !behaviors.is_empty(),
            interval,
            settings: BehaviorSettings::from_config(config),
            next: order.len(),
            order,
            behaviors,
            active: None,
            cycle_deadline: now + interval,
            next_step_time: now + interval,
        }
    }

    pub fn state(&self) -> EmotionState {
        let behavior = self.active.map(|idx| &self.behaviors[idx]);
        EmotionState {
            active: behavior.map(|b| b.kind()),
            next_select_time: self.cycle_deadline,
            angry_substate: behavior.and_then(|b| b.angry_substate()),
        }
    }

    fn advance(&mut self, now: f64, overrides: &mut Overrides, rng: &mut dyn RngCore) {
        if self.next >= self.order.len() {
            self.order.shuffle(rng);
            self.next = 0;
        }
        let idx = self.order[self.next];
        self.next += 1;
        self.active = Some(idx);
        self.cycle_deadline = now + self.interval;

        if overrides.policy() == ClearPolicy::Persist {
            overrides.clear_all();
        }
        info!("Emotion: {:?}", self.behaviors[idx].kind());
    }

    /// Invoke the active behavior when it is due
    pub fn poll(
        &mut self,
        now: f64,
        overrides: &mut Overrides,
        rng: &mut dyn RngCore,
    ) -> Option<BehaviorOutput> {
        if !self.enabled || now < self.next_step_time {
            return None;
        }
        if self.active.is_none() || now >= self.cycle_deadline {
            self.advance(now, overrides, rng);
        }
        let idx = self.active?;

        let mut ctx = BehaviorContext {
            settings: &self.settings,
            overrides,
            rng,
        };
        let output = self.behaviors[idx].invoke(&mut ctx);

        self.next_step_time = output
            .reinvoke_after
            .map_or(self.cycle_deadline, |delay| {
                (now + delay).min(self.cycle_deadline)
            });
        Some(output)
    }
}
