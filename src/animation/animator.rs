//! Eye Animator - the cooperative animation loop
//!
//! The pupil sampler drives time: every value it emits is one tick of the
//! loop, and every tick polls input, advances the gaze, blink and emotion
//! state, decides what to rebuild and renders one frame.
//!
//! ```text
//! run ─► next_target ─► pupil::sample ─► emit (tick) ─► Renderer::frame
//!  ▲                         │
//!  └──── Cancelled/Completed ┘   (pupil/context request, stop, deadline)
//! ```

use super::arbiter::EventArbiter;
use super::blink::{BlinkController, EyelidTracker};
use super::clock::Clock;
use super::emotion::{BehaviorOutput, EmotionDirector};
use super::gaze::{GazeController, GazeTransition};
use super::overrides::{ClearPolicy, Overrides};
use super::pupil::{self, PupilBounds, SampleOutcome, SampleRequest, SampleSink};
use super::regen::{RegenThresholds, RegenTracker};
use super::render::{FrameOutput, RenderContext, Renderer};
use super::uniform;
use crate::config::EyeConfig;
use crate::mapping::events::{CanonicalEvent, EventSource, GazeDirection, ProfileId};
use crate::mapping::feeds::InputFeed;
use chrono::Local;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stop requested, renderer closed or timeout reached
    Exit,
    /// Activate this profile and call `run` again
    SwitchProfile(ProfileId),
}

/// Who picked the pupil target currently being sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    Event,
    Emotion,
    Random,
}

/// Per-tick state; the sampler sees it only as a [`SampleSink`]
struct FrameLoop {
    config: EyeConfig,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    feeds: Vec<Box<dyn InputFeed + Send>>,
    scratch: Vec<CanonicalEvent>,
    arbiter: EventArbiter,
    gaze: GazeController,
    blink: BlinkController,
    eyelids: EyelidTracker,
    director: EmotionDirector,
    overrides: Overrides,
    regen: RegenTracker,
    renderer: Box<dyn Renderer>,
    ctx: RenderContext,
    sync_sender: Option<mpsc::Sender<GazeDirection>>,
    cancel: CancellationToken,
    pending_emotion: Option<BehaviorOutput>,
    current_kind: TargetKind,
    last_pupil: f64,
    stop: bool,
    timeout_at: Option<f64>,
    tenure_until: Option<f64>,
    stats: LoopStats,
}

#[derive(Debug)]
struct LoopStats {
    frames: u64,
    directed_moves: u64,
    cancelled_samples: u64,
    last_log_time: chrono::DateTime<Local>,
    log_interval: chrono::Duration,
}

impl FrameLoop {
    fn deadline_passed(&self, now: f64) -> bool {
        self.timeout_at.is_some_and(|t| now >= t) || self.tenure_until.is_some_and(|t| now >= t)
    }

    fn poll_feeds(&mut self) {
        for feed in self.feeds.iter_mut() {
            self.scratch.clear();
            feed.poll(&mut self.scratch);
            if !self.scratch.is_empty() {
                self.arbiter.stage(feed.source(), self.scratch.drain(..));
            }
        }
        self.arbiter.commit_tick();
    }

    fn publish_sync(&mut self, direction: GazeDirection) {
        let Some(sender) = &self.sync_sender else {
            return;
        };
        match sender.try_send(direction) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Sync queue full, {} not published", direction.as_str());
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Sync publisher gone, no longer publishing gaze");
                self.sync_sender = None;
            }
        }
    }

    fn update_gaze(&mut self, now: f64) {
        let command = if self.gaze.is_holding() {
            self.arbiter.next_gaze()
        } else {
            None
        };
        if let Some(command) = command {
            if command.source == EventSource::Device {
                self.publish_sync(command.direction);
            }
        }

        let transition = self.gaze.update(
            now,
            command.map(|c| c.direction),
            &mut self.overrides,
            &mut self.rng,
        );
        match transition {
            Some(GazeTransition::Directed(direction)) => {
                self.stats.directed_moves += 1;
                debug!("Gaze directed {}", direction.as_str());
            }
            Some(GazeTransition::Wander { forced: Some(direction) }) => {
                debug!("Gaze forced {}", direction.as_str());
            }
            Some(GazeTransition::Wander { forced: None }) | Some(GazeTransition::Settled) | None => {}
        }
    }

    /// Returns (upper, lower) eyelid weights
    fn update_lids(&mut self, now: f64) -> (f64, f64) {
        let forced = if self.blink.accepts_trigger() {
            self.overrides.blink_close_duration.consume()
        } else {
            None
        };
        if let Some(phase) = self.blink.update(now, self.arbiter.blink_held(), forced, &mut self.rng)
        {
            debug!("Blink {:?}", phase);
        }
        let closure = self.blink.closure(now);
        self.eyelids.update(self.gaze.current().y, closure)
    }

    fn log_stats(&mut self) {
        let now = Local::now();
        if now - self.stats.last_log_time <= self.stats.log_interval {
            return;
        }
        let elapsed = (now - self.stats.last_log_time).num_seconds().max(1);
        info!(
            "Animator stats: {} frames in {} seconds, {} events committed, {} directed moves, {} samples cancelled, {} gaze requests dropped",
            self.stats.frames,
            elapsed,
            self.arbiter.committed(),
            self.stats.directed_moves,
            self.stats.cancelled_samples,
            self.arbiter.dropped()
        );
        self.stats.frames = 0;
        self.stats.directed_moves = 0;
        self.stats.cancelled_samples = 0;
        self.stats.last_log_time = now;
    }

    fn pupil_bounds(&self) -> PupilBounds {
        PupilBounds {
            min: self.config.pupil.min,
            max: self.config.pupil.max,
        }
    }

    /// Pick the next pupil move: event, then emotion, then random
    fn next_target(&mut self) -> (SampleRequest, TargetKind) {
        let pupil = &self.config.pupil;
        let (end, duration, kind) = if let Some(request) = self.arbiter.take_pupil() {
            (
                request.target(pupil.min, pupil.max),
                pupil.event_duration_sec,
                TargetKind::Event,
            )
        } else if let Some((target, output)) = self
            .pending_emotion
            .take()
            .and_then(|output| output.pupil.map(|target| (target, output)))
        {
            (
                target,
                output.duration.unwrap_or(pupil.idle_duration_sec),
                TargetKind::Emotion,
            )
        } else {
            (
                uniform(&mut self.rng, pupil.min, pupil.max),
                pupil.idle_duration_sec,
                TargetKind::Random,
            )
        };

        let request = SampleRequest {
            start: self.last_pupil,
            end,
            duration,
            range: pupil.split_range,
        };
        (request, kind)
    }

    /// Decide whether the loop has to leave `run`
    fn outcome(&mut self) -> Option<RunOutcome> {
        if let Some(profile) = self.arbiter.take_context() {
            if profile != self.ctx.profile {
                info!("Context switch requested: {}", profile);
                return Some(RunOutcome::SwitchProfile(profile));
            }
            debug!("Profile {} already active", profile);
        }
        if self.stop || self.cancel.is_cancelled() {
            return Some(RunOutcome::Exit);
        }

        let now = self.clock.now();
        if self.timeout_at.is_some_and(|t| now >= t) {
            info!("Timeout reached after {:.1}s", now);
            return Some(RunOutcome::Exit);
        }
        if self.tenure_until.is_some_and(|t| now >= t) {
            let next = self.ctx.profile.next_in_cycle();
            info!("Demo tenure of {} over, next is {}", self.ctx.profile, next);
            return Some(RunOutcome::SwitchProfile(next));
        }
        None
    }
}

impl SampleSink for FrameLoop {
    fn now(&mut self) -> f64 {
        self.clock.now()
    }

    fn should_cancel(&mut self) -> bool {
        let now = self.clock.now();
        self.arbiter.should_interrupt()
            || (self.pending_emotion.is_some() && self.current_kind != TargetKind::Event)
            || self.stop
            || self.cancel.is_cancelled()
            || self.deadline_passed(now)
    }

    fn emit(&mut self, value: f64) {
        let now = self.clock.now();
        self.last_pupil = value;

        self.poll_feeds();
        self.update_gaze(now);
        let (upper_lid, lower_lid) = self.update_lids(now);

        if let Some(output) = self.director.poll(now, &mut self.overrides, &mut self.rng) {
            if output.pupil.is_some() {
                self.pending_emotion = Some(output);
            }
        }

        let output = FrameOutput {
            gaze: self.gaze.current(),
            pupil_scale: value,
            upper_lid,
            lower_lid,
            regen: self.regen.evaluate(value, upper_lid, lower_lid),
            profile: self.ctx.profile,
        };
        if !self.renderer.frame(&self.ctx, &output) {
            info!("Renderer closed");
            self.stop = true;
        }
        self.ctx.frame += 1;
        self.stats.frames += 1;
        self.log_stats();
    }
}

/// Owns all animation state for one eye
pub struct EyeAnimator {
    sampler_rng: StdRng,
    frame_loop: FrameLoop,
}

impl EyeAnimator {
    pub fn new(
        config: EyeConfig,
        profile: ProfileId,
        clock: Arc<dyn Clock>,
        renderer: Box<dyn Renderer>,
        cancel: CancellationToken,
    ) -> Self {
        let mut seed_rng = match config.seed {
            Some(seed) => {
                info!("Using fixed seed {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };
        let sampler_rng = StdRng::seed_from_u64(seed_rng.next_u64());
        let mut rng = StdRng::seed_from_u64(seed_rng.next_u64());

        let now = clock.now();
        let profile_config = config.profiles.get(profile).clone();
        let policy = ClearPolicy::from_flag(config.emotion.clear_overrides_on_read);

        let frame_loop = FrameLoop {
            clock,
            feeds: Vec::new(),
            scratch: Vec::new(),
            arbiter: EventArbiter::new(config.gaze.queue_capacity),
            gaze: GazeController::new(config.gaze.clone(), now, &mut rng),
            blink: BlinkController::new(config.blink.clone(), now),
            eyelids: EyelidTracker::new(config.blink.tracking),
            director: EmotionDirector::new(&config, now),
            overrides: Overrides::new(policy),
            regen: RegenTracker::new(RegenThresholds::from_geometry(&profile_config.geometry)),
            renderer,
            ctx: RenderContext::new(profile, profile_config.assets),
            sync_sender: None,
            cancel,
            pending_emotion: None,
            current_kind: TargetKind::Random,
            last_pupil: config.pupil.initial_scale,
            stop: false,
            timeout_at: config.timeout_secs.map(|secs| now + secs as f64),
            tenure_until: None,
            stats: LoopStats {
                frames: 0,
                directed_moves: 0,
                cancelled_samples: 0,
                last_log_time: Local::now(),
                log_interval: chrono::Duration::seconds(config.render.stats_interval_sec as i64),
            },
            rng,
            config,
        };

        let mut animator = Self {
            sampler_rng,
            frame_loop,
        };
        animator.activate_profile(profile);
        animator
    }

    pub fn add_feed(&mut self, feed: Box<dyn InputFeed + Send>) {
        debug!("Feed added: {:?}", feed.source());
        self.frame_loop.feeds.push(feed);
    }

    /// Gaze moves requested by the local device are forwarded here
    pub fn set_sync_sender(&mut self, sender: mpsc::Sender<GazeDirection>) {
        self.frame_loop.sync_sender = Some(sender);
    }

    pub fn profile(&self) -> ProfileId {
        self.frame_loop.ctx.profile
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_loop.ctx.frame
    }

    /// Load a profile's geometry and assets; the next frame rebuilds everything
    pub fn activate_profile(&mut self, profile: ProfileId) {
        let fl = &mut self.frame_loop;
        let profile_config = fl.config.profiles.get(profile).clone();

        fl.ctx = RenderContext {
            profile,
            assets: profile_config.assets,
            frame: fl.ctx.frame,
        };
        fl.regen
            .reset(RegenThresholds::from_geometry(&profile_config.geometry));
        fl.arbiter.clear_pending();
        fl.overrides.clear_all();
        fl.pending_emotion = None;
        fl.tenure_until = fl
            .config
            .demo
            .then(|| fl.clock.now() + fl.config.render.demo_tenure_sec);

        fl.renderer.switch_profile(&fl.ctx);
        info!("Active profile: {}", profile);
    }

    /// Animate until a profile switch or exit is due
    pub fn run(&mut self) -> RunOutcome {
        loop {
            if let Some(outcome) = self.frame_loop.outcome() {
                return outcome;
            }

            let (request, kind) = self.frame_loop.next_target();
            self.frame_loop.current_kind = kind;
            debug!(
                "Pupil {:?} {:.3} -> {:.3} over {:.2}s",
                kind, request.start, request.end, request.duration
            );

            let bounds = self.frame_loop.pupil_bounds();
            let outcome = pupil::sample(request, bounds, &mut self.sampler_rng, &mut self.frame_loop);
            if outcome == SampleOutcome::Cancelled {
                self.frame_loop.stats.cancelled_samples += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clock::ManualClock;
    use crate::animation::blink::BlinkPhase;
    use crate::animation::gaze::GAZE_RADIUS;
    use crate::config::BehaviorKind;
    use crate::controller::{ButtonState, ButtonType, RawDeviceEvent};
    use crate::mapping::feeds::{DeviceInput, NetworkInput};
    use crate::mapping::joystick::DeviceNormalizer;
    use crate::wearables::WearableMessage;
    use std::sync::Mutex;

    /// Moves the manual clock one frame per rendered frame and records output
    struct SteppingRenderer {
        clock: ManualClock,
        step: f64,
        frames: Arc<Mutex<Vec<FrameOutput>>>,
        switches: Arc<Mutex<Vec<ProfileId>>>,
        stop_after: Option<usize>,
    }

    impl Renderer for SteppingRenderer {
        fn frame(&mut self, _ctx: &RenderContext, output: &FrameOutput) -> bool {
            self.clock.advance(self.step);
            let mut frames = self.frames.lock().unwrap();
            frames.push(*output);
            self.stop_after.map_or(true, |limit| frames.len() < limit)
        }

        fn switch_profile(&mut self, ctx: &RenderContext) {
            self.switches.lock().unwrap().push(ctx.profile);
        }
    }

    struct Harness {
        animator: EyeAnimator,
        clock: ManualClock,
        frames: Arc<Mutex<Vec<FrameOutput>>>,
        switches: Arc<Mutex<Vec<ProfileId>>>,
    }

    fn harness(config: EyeConfig, step: f64, stop_after: Option<usize>) -> Harness {
        let clock = ManualClock::at(0.0);
        let frames = Arc::new(Mutex::new(Vec::new()));
        let switches = Arc::new(Mutex::new(Vec::new()));
        let renderer = SteppingRenderer {
            clock: clock.clone(),
            step,
            frames: frames.clone(),
            switches: switches.clone(),
            stop_after,
        };
        let profile = config.default_profile;
        let animator = EyeAnimator::new(
            config,
            profile,
            Arc::new(clock.clone()),
            Box::new(renderer),
            CancellationToken::new(),
        );
        Harness {
            animator,
            clock,
            frames,
            switches,
        }
    }

    fn seeded() -> EyeConfig {
        EyeConfig {
            seed: Some(11),
            ..EyeConfig::default()
        }
    }

    #[test]
    fn test_timeout_ends_run() {
        let mut config = seeded();
        config.timeout_secs = Some(2);
        let mut h = harness(config, 1.0 / 30.0, None);

        assert_eq!(h.animator.run(), RunOutcome::Exit);
        let now = h.clock.now();
        assert!((2.0..2.1).contains(&now), "stopped at {}", now);
    }

    #[test]
    fn test_frames_stay_in_range() {
        let mut config = seeded();
        config.timeout_secs = Some(20);
        let mut h = harness(config, 1.0 / 30.0, None);
        h.animator.run();

        let frames = h.frames.lock().unwrap();
        assert!(frames.len() > 100);
        let first = frames[0].regen;
        assert!(first.iris && first.upper && first.lower);
        for frame in frames.iter() {
            assert!((0.0..=1.0).contains(&frame.pupil_scale));
            assert!((0.0..=1.0).contains(&frame.upper_lid));
            assert!((0.0..=1.0).contains(&frame.lower_lid));
            assert!(frame.gaze.radius_sq() <= GAZE_RADIUS * GAZE_RADIUS + 1e-9);
            assert_eq!(frame.profile, ProfileId::Dragon);
        }
    }

    #[test]
    fn test_renderer_close_exits() {
        let mut h = harness(seeded(), 1.0 / 30.0, Some(10));
        assert_eq!(h.animator.run(), RunOutcome::Exit);
        assert_eq!(h.frames.lock().unwrap().len(), 10);
    }

    #[test]
    fn test_cancel_token_exits() {
        let clock = ManualClock::at(0.0);
        let cancel = CancellationToken::new();
        let renderer = SteppingRenderer {
            clock: clock.clone(),
            step: 0.1,
            frames: Arc::new(Mutex::new(Vec::new())),
            switches: Arc::new(Mutex::new(Vec::new())),
            stop_after: None,
        };
        let mut animator = EyeAnimator::new(
            seeded(),
            ProfileId::Cyclops,
            Arc::new(clock),
            Box::new(renderer),
            cancel.clone(),
        );
        cancel.cancel();
        assert_eq!(animator.run(), RunOutcome::Exit);
        assert_eq!(animator.frames_rendered(), 0);
    }

    #[test]
    fn test_context_event_switches_profile() {
        let mut config = seeded();
        config.timeout_secs = Some(5);
        let mut h = harness(config, 1.0 / 30.0, None);
        let (tx, rx) = mpsc::channel(8);
        h.animator.add_feed(Box::new(NetworkInput::network(rx)));
        tx.try_send(WearableMessage::sync("eye_context_hack", 0))
            .unwrap();

        assert_eq!(h.animator.run(), RunOutcome::SwitchProfile(ProfileId::Hack));
        assert!(h.clock.now() < 0.1);

        h.animator.activate_profile(ProfileId::Hack);
        assert_eq!(h.animator.profile(), ProfileId::Hack);
        assert_eq!(
            *h.switches.lock().unwrap(),
            vec![ProfileId::Dragon, ProfileId::Hack]
        );

        // Switching forces a full rebuild on the next frame
        assert_eq!(h.animator.run(), RunOutcome::Exit);
        let frames = h.frames.lock().unwrap();
        let after_switch = frames
            .iter()
            .find(|f| f.profile == ProfileId::Hack)
            .unwrap();
        assert!(after_switch.regen.iris && after_switch.regen.upper && after_switch.regen.lower);
    }

    #[test]
    fn test_demo_cycles_after_tenure() {
        let mut config = seeded();
        config.demo = true;
        config.render.demo_tenure_sec = 1.0;
        let mut h = harness(config, 1.0 / 30.0, None);

        assert_eq!(
            h.animator.run(),
            RunOutcome::SwitchProfile(ProfileId::Dragon.next_in_cycle())
        );
        assert!(h.clock.now() >= 1.0);
    }

    #[test]
    fn test_pupil_event_reaches_target() {
        let mut config = seeded();
        config.timeout_secs = Some(1);
        config.emotion.enabled = false;
        let mut h = harness(config, 0.001, None);
        let (tx, rx) = mpsc::channel(8);
        h.animator.add_feed(Box::new(NetworkInput::network(rx)));
        tx.try_send(WearableMessage::sync("pupil_widen", 0)).unwrap();

        assert_eq!(h.animator.run(), RunOutcome::Exit);
        let frames = h.frames.lock().unwrap();
        // The widen move takes 0.25 s once the running sample is cancelled
        let peak = frames
            .iter()
            .take(300)
            .map(|f| f.pupil_scale)
            .fold(0.0, f64::max);
        assert!(peak > 0.9, "peak {}", peak);
    }

    #[test]
    fn test_device_gaze_is_published_for_sync() {
        let mut config = seeded();
        config.timeout_secs = Some(1);
        let mut h = harness(config, 1.0 / 30.0, None);

        let (device_tx, device_rx) = mpsc::channel(8);
        h.animator
            .add_feed(Box::new(DeviceInput::device(device_rx, DeviceNormalizer::default())));
        let (sync_tx, mut sync_rx) = mpsc::channel(8);
        h.animator.set_sync_sender(sync_tx);

        device_tx
            .try_send(RawDeviceEvent::ButtonEvent {
                button_type: ButtonType::East,
                button_state: ButtonState::Pressed,
                timestamp: Local::now(),
            })
            .unwrap();

        h.animator.run();
        assert_eq!(sync_rx.try_recv(), Ok(GazeDirection::Center));
        assert!(sync_rx.try_recv().is_err());
    }

    #[test]
    fn test_network_gaze_is_not_published() {
        let mut config = seeded();
        config.timeout_secs = Some(1);
        let mut h = harness(config, 1.0 / 30.0, None);

        let (tx, rx) = mpsc::channel(8);
        h.animator.add_feed(Box::new(NetworkInput::network(rx)));
        let (sync_tx, mut sync_rx) = mpsc::channel(8);
        h.animator.set_sync_sender(sync_tx);
        tx.try_send(WearableMessage::sync("eye_up", 0)).unwrap();

        h.animator.run();
        assert!(sync_rx.try_recv().is_err());
    }

    /// Blink starts seen while one behavior stayed active
    #[derive(Debug)]
    struct BlinkWindow {
        behavior: Option<BehaviorKind>,
        starts: u32,
        reopened: bool,
        last_phase: BlinkPhase,
    }

    /// Angry and Normal alternate every 2 s; Angry is invoked once per selection
    fn angry_config(clear_on_read: bool) -> EyeConfig {
        let mut config = seeded();
        config.blink.autoblink = false;
        config.emotion.behaviors = vec![BehaviorKind::Angry, BehaviorKind::Normal];
        config.emotion.interval_sec = 2.0;
        config.emotion.angry_step_sec = 10.0;
        config.emotion.clear_overrides_on_read = clear_on_read;
        config
    }

    /// Drive the frame loop directly and group blink starts by active behavior.
    /// Also returns how many times Angry was selected.
    fn blink_windows(config: EyeConfig, frames: usize) -> (Vec<BlinkWindow>, u32) {
        let mut h = harness(config, 1.0 / 30.0, None);
        let fl = &mut h.animator.frame_loop;
        let mut windows: Vec<BlinkWindow> = Vec::new();
        let mut angry_selections = 0;

        for _ in 0..frames {
            let state = fl.director.state();
            let before = fl.blink.phase();
            fl.emit(0.5);
            let after = fl.blink.phase();

            let selected = fl.director.state();
            if selected.next_select_time != state.next_select_time
                && selected.active == Some(BehaviorKind::Angry)
            {
                angry_selections += 1;
            }

            // The lids are updated before the director runs, so a frame
            // belongs to the behavior active when it started
            if windows.last().map_or(true, |w| w.behavior != state.active) {
                windows.push(BlinkWindow {
                    behavior: state.active,
                    starts: 0,
                    reopened: false,
                    last_phase: before,
                });
            }
            let window = windows.last_mut().unwrap();
            if after == BlinkPhase::Closing && before != BlinkPhase::Closing {
                window.starts += 1;
            }
            if window.starts > 0 && after == BlinkPhase::None {
                window.reopened = true;
            }
            window.last_phase = after;
        }
        (windows, angry_selections)
    }

    #[test]
    fn test_angry_blink_fires_once_when_cleared_on_read() {
        let (windows, angry_selections) = blink_windows(angry_config(true), 590);

        assert!(angry_selections >= 1);
        let starts: u32 = windows.iter().map(|w| w.starts).sum();
        assert_eq!(starts, angry_selections, "{:?}", windows);
        for window in windows.iter().filter(|w| w.behavior != Some(BehaviorKind::Angry)) {
            assert_eq!(window.starts, 0, "{:?}", window);
        }
    }

    #[test]
    fn test_persisted_angry_blink_repeats_until_behavior_changes() {
        let (windows, _) = blink_windows(angry_config(false), 590);

        // A persisted close duration is read again every time the lid may
        // close, so the eye keeps blinking and never rests open
        let angry: Vec<&BlinkWindow> = windows
            .iter()
            .filter(|w| w.behavior == Some(BehaviorKind::Angry))
            .collect();
        assert!(!angry.is_empty());
        for window in &angry {
            assert!(window.starts >= 5, "{:?}", window);
            assert!(!window.reopened, "{:?}", window);
        }

        // Moving on clears the override and the eye opens again
        for window in windows.iter().filter(|w| w.behavior != Some(BehaviorKind::Angry)) {
            assert_eq!(window.starts, 0, "{:?}", window);
        }
        let after_angry = windows
            .windows(2)
            .find(|pair| {
                pair[0].behavior == Some(BehaviorKind::Angry)
                    && pair[1].behavior == Some(BehaviorKind::Normal)
            })
            .map(|pair| &pair[1])
            .unwrap();
        assert_eq!(after_angry.last_phase, BlinkPhase::None);
    }
}
