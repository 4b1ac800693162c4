use chrono::{DateTime, Local};
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Raw device event with chrono timestamps
#[derive(Debug, Clone)]
pub enum RawDeviceEvent {
    /// Stick axis position as a fraction of its travel (0.0 = min, 1.0 = max)
    StickMoved {
        axis: StickAxis,
        fraction: f32,
        timestamp: DateTime<Local>,
    },
    HatMoved {
        direction: HatDirection,
        timestamp: DateTime<Local>,
    },
    ButtonEvent {
        button_type: ButtonType,
        button_state: ButtonState,
        timestamp: DateTime<Local>,
    },
    Connected {
        name: String,
    },
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickAxis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HatDirection {
    Centered,
    Forward,
    Back,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonType {
    South,
    East,
    West,
    North,
    Start,
    Select,
    Mode,
    LeftBumper,
    RightBumper,
    LeftStick,
    RightStick,
}

#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub invert_x: bool,
    pub invert_y: bool,
    /// How often a missing gamepad is searched for again
    pub retry_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            invert_x: false,
            invert_y: false,
            retry_interval: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),
}

/// Fixed-interval gate for reconnect attempts
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl RetryBackoff {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_attempt: None,
        }
    }

    /// True (and records the attempt) when no attempt happened in the last interval
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last_attempt {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_attempt = Some(now);
                true
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    gilrs: Gilrs,

    // Gamepad whose events are forwarded, None while searching
    active_gamepad: Option<GamepadId>,

    settings: CollectorSettings,

    event_sender: mpsc::Sender<RawDeviceEvent>,

    rescan: RetryBackoff,
}

impl<S: CollectionState> EventCollector<S> {
    fn send(&self, event: RawDeviceEvent) -> Result<(), CollectorError> {
        match self.event_sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("Device queue full, dropping {:?}", event);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(CollectorError::EventSendError(
                "device queue closed".to_string(),
            )),
        }
    }

    // Pick the first connected gamepad, announcing it downstream
    fn select_gamepad(&mut self) -> Result<(), CollectorError> {
        let found = self
            .gilrs
            .gamepads()
            .find(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, gamepad)| (id, gamepad.name().to_string()));

        if let Some((id, name)) = found {
            info!("Selected gamepad: {} ({})", name, id);
            self.active_gamepad = Some(id);
            self.send(RawDeviceEvent::Connected { name })?;
        }
        Ok(())
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<RawDeviceEvent>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        let gilrs = Gilrs::new().map_err(|e| {
            error!("Failed to initialize gilrs: {}", e);
            CollectorError::InitializationError(e.to_string())
        })?;
        info!("Successfully initialized gilrs");

        let rescan = RetryBackoff::new(settings.retry_interval);
        Ok(Self::new(gilrs, None, settings, event_sender, rescan))
    }

    pub fn initialize(mut self) -> Result<EventCollector<Collecting>, CollectorError> {
        let count = self.gilrs.gamepads().count();
        if count == 0 {
            warn!("No gamepad connected, running autonomously until one appears");
        } else {
            info!("Found {} gamepads", count);
        }
        self.rescan.ready(Instant::now());
        self.select_gamepad()?;

        info!("Event Collector initialized, transitioning to Collecting state");
        Ok(self.transition())
    }
}

impl EventCollector<Collecting> {
    /// Drain everything gilrs has queued; stops only when the consumer is gone
    pub fn collect_pending(&mut self) -> Result<usize, CollectorError> {
        let mut forwarded = 0;

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected if self.active_gamepad.is_none() => {
                    let name = self.gilrs.gamepad(id).name().to_string();
                    info!("Gamepad connected: {} ({})", name, id);
                    self.active_gamepad = Some(id);
                    self.send(RawDeviceEvent::Connected { name })?;
                    continue;
                }
                EventType::Disconnected if self.active_gamepad == Some(id) => {
                    warn!("Active gamepad {} disconnected", id);
                    self.active_gamepad = None;
                    self.send(RawDeviceEvent::Disconnected)?;
                    continue;
                }
                _ => {}
            }

            if self.active_gamepad != Some(id) {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                continue;
            }

            if let Some(raw_event) = convert_event(event, &self.settings, Local::now()) {
                debug!("Captured event: {:?}", raw_event);
                self.send(raw_event)?;
                forwarded += 1;
            }
        }

        Ok(forwarded)
    }

    pub fn run_collection_loop(&mut self, cancel: &CancellationToken) -> Result<(), CollectorError> {
        info!("Starting Event Collector loop");

        let mut event_count = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        while !cancel.is_cancelled() {
            event_count += self.collect_pending()?;

            if self.active_gamepad.is_none() && self.rescan.ready(Instant::now()) {
                debug!("Searching for a gamepad");
                self.select_gamepad()?;
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Event Collector stats: forwarded {} events in last {} seconds (avg {:.2}/sec)",
                    event_count,
                    log_interval.num_seconds(),
                    event_count as f64 / log_interval.num_seconds() as f64
                );
                event_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(self.settings.poll_interval);
        }

        info!("Event Collector loop cancelled");
        Ok(())
    }
}

/// Convert a gilrs event into a device event, None for anything we do not use
pub fn convert_event(
    event: EventType,
    settings: &CollectorSettings,
    now: DateTime<Local>,
) -> Option<RawDeviceEvent> {
    match event {
        EventType::AxisChanged(axis, value, _) => match axis {
            Axis::LeftStickX => Some(RawDeviceEvent::StickMoved {
                axis: StickAxis::X,
                fraction: axis_fraction(value, settings.invert_x),
                timestamp: now,
            }),
            Axis::LeftStickY => Some(RawDeviceEvent::StickMoved {
                axis: StickAxis::Y,
                fraction: axis_fraction(value, settings.invert_y),
                timestamp: now,
            }),
            Axis::DPadY => Some(RawDeviceEvent::HatMoved {
                direction: if value > 0.5 {
                    HatDirection::Forward
                } else if value < -0.5 {
                    HatDirection::Back
                } else {
                    HatDirection::Centered
                },
                timestamp: now,
            }),
            Axis::DPadX => Some(RawDeviceEvent::HatMoved {
                direction: if value > 0.5 {
                    HatDirection::Right
                } else if value < -0.5 {
                    HatDirection::Left
                } else {
                    HatDirection::Centered
                },
                timestamp: now,
            }),
            _ => {
                debug!("Ignoring unsupported axis: {:?}", axis);
                None
            }
        },
        EventType::ButtonPressed(button, _) => {
            button_event(button, ButtonState::Pressed, now)
        }
        EventType::ButtonReleased(button, _) => {
            button_event(button, ButtonState::Released, now)
        }
        _ => None,
    }
}

fn button_event(button: Button, state: ButtonState, now: DateTime<Local>) -> Option<RawDeviceEvent> {
    let hat = match button {
        Button::DPadUp => Some(HatDirection::Forward),
        Button::DPadDown => Some(HatDirection::Back),
        Button::DPadLeft => Some(HatDirection::Left),
        Button::DPadRight => Some(HatDirection::Right),
        _ => None,
    };
    if let Some(direction) = hat {
        let direction = match state {
            ButtonState::Pressed => direction,
            ButtonState::Released => HatDirection::Centered,
        };
        return Some(RawDeviceEvent::HatMoved {
            direction,
            timestamp: now,
        });
    }

    map_button(button).map(|button_type| RawDeviceEvent::ButtonEvent {
        button_type,
        button_state: state,
        timestamp: now,
    })
}

fn map_button(button: Button) -> Option<ButtonType> {
    match button {
        Button::South => Some(ButtonType::South),
        Button::East => Some(ButtonType::East),
        Button::West => Some(ButtonType::West),
        Button::North => Some(ButtonType::North),
        Button::Start => Some(ButtonType::Start),
        Button::Select => Some(ButtonType::Select),
        Button::Mode => Some(ButtonType::Mode),
        Button::LeftTrigger => Some(ButtonType::LeftBumper),
        Button::RightTrigger => Some(ButtonType::RightBumper),
        Button::LeftThumb => Some(ButtonType::LeftStick),
        Button::RightThumb => Some(ButtonType::RightStick),
        _ => None,
    }
}

// gilrs reports [-1, 1]; downstream zones work on the fraction of travel
fn axis_fraction(value: f32, invert: bool) -> f32 {
    let value = if invert { -value } else { value };
    ((value + 1.0) * 0.5).clamp(0.0, 1.0)
}
