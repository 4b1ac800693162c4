//! gecko-eye: animation and event arbitration for an animatronic eye
//!
//! ```text
//! controller/  gamepad collector (gilrs)       ─┐
//! wearables/   multicast receivers, sync sender ─┼─► mapping/ ─► animation/ ─► Renderer
//! config       typed TOML settings             ─┘
//! ```

pub mod animation;
pub mod config;
pub mod controller;
pub mod mapping;
pub mod wearables;
