//! # Configuration
//!
//! One typed [`EyeConfig`] persisted as TOML under
//! `~/.config/gecko-eye/config.toml`. A default file is written on first start
//! so the values can be tuned without a rebuild. Two environment variables are
//! honored on top of the file:
//!
//! - `GECKO_EYE_CONFIG` replaces the file path
//! - `EYE_SELECT` replaces the starting profile

use crate::controller::CollectorSettings;
use crate::mapping::joystick::{default_bindings, ButtonBinding};
use crate::mapping::ProfileId;
use crate::wearables::NetworkConfig;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/gecko-eye";
const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "GECKO_EYE_CONFIG";
pub const EYE_SELECT_ENV: &str = "EYE_SELECT";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name}: minimum {min} is greater than maximum {max}")]
    InvertedRange { name: String, min: f64, max: f64 },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: String, value: f64 },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PupilConfig {
    pub min: f64,
    pub max: f64,
    /// Duration of a widen/narrow move requested by an event
    pub event_duration_sec: f64,
    /// Duration of an autonomous move to a random scale
    pub idle_duration_sec: f64,
    /// Initial random range of the recursive sampler
    pub split_range: f64,
    pub initial_scale: f64,
}

impl Default for PupilConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            event_duration_sec: 0.25,
            idle_duration_sec: 4.0,
            split_range: 1.0,
            initial_scale: 0.5,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GazeConfig {
    pub move_duration_min_sec: f64,
    pub move_duration_max_sec: f64,
    pub hold_duration_min_sec: f64,
    pub hold_duration_max_sec: f64,
    /// Move duration for a direction requested by an event
    pub event_move_duration_sec: f64,
    pub queue_capacity: usize,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            move_duration_min_sec: 1.1,
            move_duration_max_sec: 3.0,
            hold_duration_min_sec: 1.1,
            hold_duration_max_sec: 3.0,
            event_move_duration_sec: 0.12,
            queue_capacity: 8,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BlinkConfig {
    pub autoblink: bool,
    /// Eyelids follow vertical gaze
    pub tracking: bool,
    pub duration_close_min_sec: f64,
    pub duration_close_max_sec: f64,
    pub duration_open_min_sec: f64,
    pub duration_open_max_sec: f64,
    /// Multiplier on the close duration giving the base time to the next blink
    pub interval_scale: f64,
    pub interval_range_sec: f64,
    pub duration_user_min_sec: f64,
    pub duration_user_max_sec: f64,
    pub angry_duration_close_min_sec: f64,
    pub angry_duration_close_max_sec: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            autoblink: true,
            tracking: true,
            duration_close_min_sec: 0.5,
            duration_close_max_sec: 1.5,
            duration_open_min_sec: 0.5,
            duration_open_max_sec: 1.5,
            interval_scale: 15.0,
            interval_range_sec: 4.0,
            duration_user_min_sec: 0.035,
            duration_user_max_sec: 0.06,
            angry_duration_close_min_sec: 0.05,
            angry_duration_close_max_sec: 0.12,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Normal,
    DilatedPupil,
    SquintPupil,
    Angry,
    StaringAhead,
}

impl BehaviorKind {
    pub const ALL: [BehaviorKind; 5] = [
        BehaviorKind::Normal,
        BehaviorKind::DilatedPupil,
        BehaviorKind::SquintPupil,
        BehaviorKind::Angry,
        BehaviorKind::StaringAhead,
    ];
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EmotionConfig {
    pub enabled: bool,
    /// Time each behavior stays selected
    pub interval_sec: f64,
    /// Re-invocation delay while angry
    pub angry_step_sec: f64,
    /// Overrides are dropped once read; otherwise they last for the behavior
    pub clear_overrides_on_read: bool,
    pub behaviors: Vec<BehaviorKind>,
    pub pupil_move_sec: f64,
    pub staring_hold_sec: f64,
    pub angry_move_sec: f64,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_sec: 12.0,
            angry_step_sec: 2.5,
            clear_overrides_on_read: true,
            behaviors: BehaviorKind::ALL.to_vec(),
            pupil_move_sec: 1.0,
            staring_hold_sec: 6.0,
            angry_move_sec: 0.3,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub enabled: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    pub retry_interval_secs: u64,
    pub queue_capacity: usize,
    pub bindings: Vec<ButtonBinding>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            invert_x: false,
            invert_y: false,
            retry_interval_secs: 5,
            queue_capacity: 256,
            bindings: default_bindings(),
        }
    }
}

impl InputConfig {
    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            invert_x: self.invert_x,
            invert_y: self.invert_y,
            retry_interval: Duration::from_secs(self.retry_interval_secs),
            ..CollectorSettings::default()
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub fps: u32,
    /// Seconds each profile is shown in demo mode
    pub demo_tenure_sec: f64,
    pub stats_interval_sec: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            demo_tenure_sec: 30.0,
            stats_interval_sec: 10,
        }
    }
}

/// Axis-aligned bounds of a path, in display pixels
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn square(half: f64) -> Self {
        Self {
            min_x: -half,
            min_y: -half,
            max_x: half,
            max_y: half,
        }
    }
}

/// Midpoints of an eyelid's open and closed paths
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct LidPath {
    pub open_mid: [f64; 2],
    pub closed_mid: [f64; 2],
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ProfileGeometry {
    pub pupil_min: Bounds,
    pub pupil_max: Bounds,
    pub upper_lid: LidPath,
    pub lower_lid: LidPath,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ProfileAssets {
    pub eye_shape: PathBuf,
    pub iris_art: PathBuf,
    pub lid_art: PathBuf,
    pub sclera_art: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ProfileConfig {
    pub assets: ProfileAssets,
    pub geometry: ProfileGeometry,
}

impl ProfileConfig {
    fn builtin(dir: &str, shape: &str, iris: &str, sclera: &str, pupil: (f64, f64)) -> Self {
        let path = |file: &str| PathBuf::from(dir).join(file);
        Self {
            assets: ProfileAssets {
                eye_shape: path(shape),
                iris_art: path(iris),
                lid_art: path("lid.png"),
                sclera_art: path(sclera),
            },
            geometry: ProfileGeometry {
                pupil_min: Bounds::square(pupil.0),
                pupil_max: Bounds::square(pupil.1),
                upper_lid: LidPath {
                    open_mid: [0.0, 118.0],
                    closed_mid: [0.0, -24.0],
                },
                lower_lid: LidPath {
                    open_mid: [0.0, -126.0],
                    closed_mid: [0.0, -22.0],
                },
            },
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ProfileTable {
    pub cyclops: ProfileConfig,
    pub dragon: ProfileConfig,
    pub hack: ProfileConfig,
    pub custom: ProfileConfig,
}

impl ProfileTable {
    pub fn get(&self, id: ProfileId) -> &ProfileConfig {
        match id {
            ProfileId::Cyclops => &self.cyclops,
            ProfileId::Dragon => &self.dragon,
            ProfileId::Hack => &self.hack,
            ProfileId::Custom => &self.custom,
        }
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            cyclops: ProfileConfig::builtin(
                "graphics",
                "cyclops-eye.svg",
                "iris.jpg",
                "sclera.png",
                (38.0, 92.0),
            ),
            dragon: ProfileConfig::builtin(
                "graphics",
                "dragon-eye.svg",
                "dragon-iris.jpg",
                "dragon-sclera.png",
                (18.0, 84.0),
            ),
            hack: ProfileConfig::builtin(
                "hack_graphics",
                "gecko-eye_0.svg",
                "iris.jpg",
                "sclera.jpg",
                (30.0, 88.0),
            ),
            custom: ProfileConfig::builtin(
                "custom_graphics",
                "eye.svg",
                "iris.jpg",
                "sclera.png",
                (30.0, 88.0),
            ),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EyeConfig {
    /// Cycle through the built-in profiles, headless
    pub demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Fixed RNG seed for reproducible runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub default_profile: ProfileId,
    pub pupil: PupilConfig,
    pub gaze: GazeConfig,
    pub blink: BlinkConfig,
    pub emotion: EmotionConfig,
    pub input: InputConfig,
    pub network: NetworkConfig,
    pub render: RenderConfig,
    pub profiles: ProfileTable,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            demo: false,
            timeout_secs: None,
            seed: None,
            default_profile: ProfileId::Dragon,
            pupil: PupilConfig::default(),
            gaze: GazeConfig::default(),
            blink: BlinkConfig::default(),
            emotion: EmotionConfig::default(),
            input: InputConfig::default(),
            network: NetworkConfig::default(),
            render: RenderConfig::default(),
            profiles: ProfileTable::default(),
        }
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvertedRange {
            name: name.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0) {
        return Err(ConfigError::NonPositive {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

impl EyeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("pupil", self.pupil.min, self.pupil.max)?;
        check_positive("pupil.event_duration_sec", self.pupil.event_duration_sec)?;
        check_positive("pupil.idle_duration_sec", self.pupil.idle_duration_sec)?;
        if self.pupil.split_range < 0.0 {
            return Err(ConfigError::Invalid(
                "pupil.split_range must not be negative".to_string(),
            ));
        }

        let gaze = &self.gaze;
        check_range("gaze.move_duration", gaze.move_duration_min_sec, gaze.move_duration_max_sec)?;
        check_range("gaze.hold_duration", gaze.hold_duration_min_sec, gaze.hold_duration_max_sec)?;
        check_positive("gaze.move_duration_min_sec", gaze.move_duration_min_sec)?;
        check_positive("gaze.hold_duration_min_sec", gaze.hold_duration_min_sec)?;
        check_positive("gaze.event_move_duration_sec", gaze.event_move_duration_sec)?;
        if gaze.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "gaze.queue_capacity must be at least 1".to_string(),
            ));
        }

        let blink = &self.blink;
        for (name, min, max) in [
            ("blink.duration_close", blink.duration_close_min_sec, blink.duration_close_max_sec),
            ("blink.duration_open", blink.duration_open_min_sec, blink.duration_open_max_sec),
            ("blink.duration_user", blink.duration_user_min_sec, blink.duration_user_max_sec),
            (
                "blink.angry_duration_close",
                blink.angry_duration_close_min_sec,
                blink.angry_duration_close_max_sec,
            ),
        ] {
            check_range(name, min, max)?;
            check_positive(name, min)?;
        }
        if blink.interval_scale < 0.0 || blink.interval_range_sec < 0.0 {
            return Err(ConfigError::Invalid(
                "blink interval settings must not be negative".to_string(),
            ));
        }

        check_positive("emotion.interval_sec", self.emotion.interval_sec)?;
        check_positive("emotion.angry_step_sec", self.emotion.angry_step_sec)?;
        check_positive("emotion.pupil_move_sec", self.emotion.pupil_move_sec)?;
        check_positive("emotion.staring_hold_sec", self.emotion.staring_hold_sec)?;
        check_positive("emotion.angry_move_sec", self.emotion.angry_move_sec)?;
        if self.emotion.enabled && self.emotion.behaviors.is_empty() {
            return Err(ConfigError::Invalid(
                "emotion.behaviors is empty while emotions are enabled".to_string(),
            ));
        }

        if self.render.fps == 0 {
            return Err(ConfigError::Invalid("render.fps must be at least 1".to_string()));
        }
        check_positive("render.demo_tenure_sec", self.render.demo_tenure_sec)?;

        if self.network.queue_capacity == 0 || self.input.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue capacities must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply `EYE_SELECT` on top of the file
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(selected) = std::env::var(EYE_SELECT_ENV) {
            self.default_profile = selected
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("{}: {}", EYE_SELECT_ENV, e)))?;
            info!("{} selects profile {}", EYE_SELECT_ENV, self.default_profile);
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Read the config file, writing the defaults first if it does not exist
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check config file {}: {}", path.display(), e))?;

        let config = if exists {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
            let config: EyeConfig = toml::from_str(&content)
                .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;
            debug!("Loaded config from {}", path.display());
            config
        } else {
            let config = EyeConfig::default();
            config.save(path).await?;
            info!("Wrote default config to {}", path.display());
            config
        };

        config
            .validate()
            .map_err(|e| eyre!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;
        Ok(())
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
