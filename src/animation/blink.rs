//! Eyelid closure: blink FSM plus gaze-tracking bias

use super::uniform;
use crate::config::BlinkConfig;
use rand::RngCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPhase {
    None,
    Closing,
    Opening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkInput {
    /// Autonomous, forced or user trigger
    Start,
    /// The current phase's duration has run out
    DurationElapsed { held: bool },
}

/// The only way phases change
pub fn transition(phase: BlinkPhase, input: BlinkInput) -> BlinkPhase {
    match (phase, input) {
        (_, BlinkInput::Start) => BlinkPhase::Closing,
        (BlinkPhase::Closing, BlinkInput::DurationElapsed { held: true }) => BlinkPhase::Closing,
        (BlinkPhase::Closing, BlinkInput::DurationElapsed { held: false }) => BlinkPhase::Opening,
        (BlinkPhase::Opening, BlinkInput::DurationElapsed { .. }) => BlinkPhase::None,
        (BlinkPhase::None, BlinkInput::DurationElapsed { .. }) => BlinkPhase::None,
    }
}

#[derive(Debug, Clone)]
pub struct BlinkState {
    pub phase: BlinkPhase,
    pub blink_start_time: f64,
    pub blink_duration: f64,
    pub time_of_last_blink: f64,
    pub time_to_next_blink: f64,
    pub held_closed: bool,
}

#[derive(Debug)]
pub struct BlinkController {
    state: BlinkState,
    config: BlinkConfig,
}

impl BlinkController {
    pub fn new(config: BlinkConfig, now: f64) -> Self {
        Self {
            state: BlinkState {
                phase: BlinkPhase::None,
                blink_start_time: now,
                blink_duration: 0.1,
                time_of_last_blink: now,
                time_to_next_blink: 1.0,
                held_closed: false,
            },
            config,
        }
    }

    pub fn state(&self) -> &BlinkState {
        &self.state
    }

    pub fn phase(&self) -> BlinkPhase {
        self.state.phase
    }

    /// A new blink may start (a forced close would not be wasted)
    pub fn accepts_trigger(&self) -> bool {
        self.state.phase != BlinkPhase::Closing
    }

    /// Advance one frame; returns the new phase when it changed
    pub fn update(
        &mut self,
        now: f64,
        held: bool,
        forced_close: Option<f64>,
        rng: &mut dyn RngCore,
    ) -> Option<BlinkPhase> {
        let before = self.state.phase;
        let cfg = &self.config;

        let due = cfg.autoblink
            && now - self.state.time_of_last_blink >= self.state.time_to_next_blink;
        if due || forced_close.is_some() {
            self.state.time_of_last_blink = now;
            let duration = forced_close.unwrap_or_else(|| {
                uniform(rng, cfg.duration_close_min_sec, cfg.duration_close_max_sec)
            });
            if self.state.phase != BlinkPhase::Closing {
                self.state.phase = transition(self.state.phase, BlinkInput::Start);
                self.state.blink_start_time = now;
                self.state.blink_duration = duration;
            }
            self.state.time_to_next_blink =
                duration * cfg.interval_scale + uniform(rng, 0.0, cfg.interval_range_sec);
        }

        if self.state.phase != BlinkPhase::None {
            if now - self.state.blink_start_time >= self.state.blink_duration {
                let next = transition(self.state.phase, BlinkInput::DurationElapsed { held });
                if next == BlinkPhase::Opening && self.state.phase != BlinkPhase::Opening {
                    self.state.blink_duration =
                        uniform(rng, cfg.duration_open_min_sec, cfg.duration_open_max_sec);
                    self.state.blink_start_time = now;
                }
                self.state.phase = next;
            }
        } else if held {
            // User close works with autoblink off too
            self.state.phase = transition(self.state.phase, BlinkInput::Start);
            self.state.blink_start_time = now;
            self.state.blink_duration =
                uniform(rng, cfg.duration_user_min_sec, cfg.duration_user_max_sec);
        }

        self.state.held_closed = held && self.state.phase == BlinkPhase::Closing;
        (self.state.phase != before).then_some(self.state.phase)
    }

    /// Lid closure in [0, 1]: 0 open, 1 shut
    pub fn closure(&self, now: f64) -> f64 {
        let progress = if self.state.blink_duration > 0.0 {
            ((now - self.state.blink_start_time) / self.state.blink_duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        match self.state.phase {
            BlinkPhase::None => 0.0,
            BlinkPhase::Closing => progress,
            BlinkPhase::Opening => 1.0 - progress,
        }
    }
}

/// Eyelid weights for the renderer, biased by vertical gaze
#[derive(Debug, Clone)]
pub struct EyelidTracker {
    tracking: f64,
    enabled: bool,
}

impl EyelidTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            tracking: 0.3,
            enabled,
        }
    }

    /// Returns (upper, lower) weights, both in [0, 1]
    pub fn update(&mut self, gaze_y: f64, closure: f64) -> (f64, f64) {
        if self.enabled {
            // 0 = fully up, 1 = fully down
            let n = (0.5 - gaze_y / 70.0).clamp(0.0, 1.0);
            self.tracking = (self.tracking * 3.0 + n) * 0.25;
        }
        let t = self.tracking;
        let closure = closure.clamp(0.0, 1.0);
        (t + closure * (1.0 - t), (1.0 - t) + closure * t)
    }
}
