//! Renderer init settings

use crate::debug::DebugFlags;
use crate::error::Result;
use bitflags::bitflags;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tessel_core::RendererType;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ResetFlags: u32 {
        const FULLSCREEN = 0x0000_0001;
        const MSAA_X2 = 0x0000_0010;
        const MSAA_X4 = 0x0000_0020;
        const MSAA_X8 = 0x0000_0030;
        const MSAA_X16 = 0x0000_0040;
        const MSAA_MASK = 0x0000_0070;
        const VSYNC = 0x0000_0080;
        const CAPTURE = 0x0000_0100;
    }
}

/// Engine init settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitSettings {
    pub renderer: RendererType,
    pub resolution: ResolutionSettings,
    pub debug: DebugFlags,
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionSettings {
    pub width: u32,
    pub height: u32,
    pub reset: ResetFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub max_draw_calls: u32,
    /// Bytes of transient vertex memory per frame
    pub transient_vb_size: u32,
    /// Bytes of transient index memory per frame
    pub transient_ib_size: u32,
    /// Bytes of instance data per frame
    pub instance_buffer_size: u32,
    /// Live handles per resource kind
    pub max_handles: u16,
    pub max_uniform_floats: u32,
}

impl Default for InitSettings {
    fn default() -> Self {
        Self {
            renderer: RendererType::Null,
            resolution: ResolutionSettings::default(),
            debug: DebugFlags::empty(),
            limits: LimitSettings::default(),
        }
    }
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            reset: ResetFlags::VSYNC,
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_draw_calls: 65535,
            transient_vb_size: 6 << 20,
            transient_ib_size: 2 << 20,
            instance_buffer_size: 2 << 20,
            max_handles: 4096,
            max_uniform_floats: 1 << 20,
        }
    }
}

impl InitSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Native surface the backend renders into.
///
/// Forwarded untouched; must be set before [`crate::Renderer::init`].
/// Headless backends accept `PlatformData::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformData {
    pub window: Option<RawWindowHandle>,
    pub display: Option<RawDisplayHandle>,
}

impl PlatformData {
    pub fn is_headless(&self) -> bool {
        self.window.is_none()
    }
}
