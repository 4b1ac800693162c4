//! Renderer seam
//!
//! The animation loop hands one [`FrameOutput`] per tick to a [`Renderer`].
//! The renderer owns frame pacing: `frame` returns once the frame is shown,
//! and `false` asks the loop to stop.

use super::gaze::Point;
use super::regen::RegenFlags;
use crate::config::{ProfileAssets, RenderConfig};
use crate::mapping::ProfileId;
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything the renderer needs besides the per-frame values
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub profile: ProfileId,
    pub assets: ProfileAssets,
    pub frame: u64,
}

impl RenderContext {
    pub fn new(profile: ProfileId, assets: ProfileAssets) -> Self {
        Self {
            profile,
            assets,
            frame: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    pub gaze: Point,
    pub pupil_scale: f64,
    pub upper_lid: f64,
    pub lower_lid: f64,
    pub regen: RegenFlags,
    pub profile: ProfileId,
}

pub trait Renderer: Send {
    /// Show one frame; `false` stops the animation loop
    fn frame(&mut self, ctx: &RenderContext, output: &FrameOutput) -> bool;

    /// Load the assets of a new profile
    fn switch_profile(&mut self, ctx: &RenderContext);
}

/// Draws nothing. Keeps the frame rate and logs what would be drawn.
#[derive(Debug)]
pub struct HeadlessRenderer {
    frame_interval: Duration,
    next_deadline: Option<Instant>,
    stats_interval: chrono::Duration,
    last_stats_time: DateTime<Local>,
    frames: u64,
    rebuilds: u64,
}

impl HeadlessRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            frame_interval: Duration::from_secs_f64(1.0 / f64::from(config.fps.max(1))),
            next_deadline: None,
            stats_interval: chrono::Duration::seconds(config.stats_interval_sec as i64),
            last_stats_time: Local::now(),
            frames: 0,
            rebuilds: 0,
        }
    }

    fn pace(&mut self) {
        let now = Instant::now();
        let deadline = self.next_deadline.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        // Fell behind: restart pacing rather than bursting to catch up
        let base = if deadline + self.frame_interval < now {
            now
        } else {
            deadline
        };
        self.next_deadline = Some(base + self.frame_interval);
    }

    fn log_stats(&mut self, profile: ProfileId) {
        let now = Local::now();
        if now - self.last_stats_time <= self.stats_interval {
            return;
        }
        let elapsed = (now - self.last_stats_time).num_milliseconds().max(1) as f64 / 1000.0;
        info!(
            "Renderer stats: {} frames ({:.1} fps), {} mesh rebuilds, profile {}",
            self.frames,
            self.frames as f64 / elapsed,
            self.rebuilds,
            profile
        );
        self.frames = 0;
        self.rebuilds = 0;
        self.last_stats_time = now;
    }
}

impl Renderer for HeadlessRenderer {
    fn frame(&mut self, ctx: &RenderContext, output: &FrameOutput) -> bool {
        self.pace();

        self.frames += 1;
        let regen = output.regen;
        self.rebuilds += [regen.iris, regen.upper, regen.lower]
            .iter()
            .filter(|flag| **flag)
            .count() as u64;

        debug!(
            "frame {} gaze ({:.1}, {:.1}) pupil {:.3} lids {:.3}/{:.3} regen {:?}",
            ctx.frame,
            output.gaze.x,
            output.gaze.y,
            output.pupil_scale,
            output.upper_lid,
            output.lower_lid,
            regen
        );

        self.log_stats(output.profile);
        true
    }

    fn switch_profile(&mut self, ctx: &RenderContext) {
        info!(
            "Profile {}: shape {}, iris {}",
            ctx.profile,
            ctx.assets.eye_shape.display(),
            ctx.assets.iris_art.display()
        );
        self.next_deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileTable;

    #[test]
    fn test_headless_paces_frames() {
        let config = RenderConfig {
            fps: 200,
            ..RenderConfig::default()
        };
        let mut renderer = HeadlessRenderer::new(&config);
        let assets = ProfileTable::default().get(ProfileId::Hack).assets.clone();
        let mut ctx = RenderContext::new(ProfileId::Hack, assets);
        renderer.switch_profile(&ctx);

        let output = FrameOutput {
            gaze: Point::ORIGIN,
            pupil_scale: 0.5,
            upper_lid: 0.3,
            lower_lid: 0.7,
            regen: RegenFlags::default(),
            profile: ProfileId::Hack,
        };

        let started = Instant::now();
        for _ in 0..5 {
            assert!(renderer.frame(&ctx, &output));
            ctx.frame += 1;
        }
        // First frame is immediate, four intervals of 5 ms follow
        assert!(started.elapsed() >= Duration::from_millis(19));
        assert_eq!(renderer.frames, 5);
    }
}
