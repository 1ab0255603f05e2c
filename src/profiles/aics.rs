//! Audio Input Control Service server state

use crate::error::RpcError;

/// Audio Input Type characteristic values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioInputType {
    Unspecified = 0x00,
    Bluetooth = 0x01,
    Microphone = 0x02,
    Analog = 0x03,
    Digital = 0x04,
    Radio = 0x05,
    Streaming = 0x06,
    Ambient = 0x07,
}

impl TryFrom<u8> for AudioInputType {
    type Error = RpcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => Self::Unspecified,
            0x01 => Self::Bluetooth,
            0x02 => Self::Microphone,
            0x03 => Self::Analog,
            0x04 => Self::Digital,
            0x05 => Self::Radio,
            0x06 => Self::Streaming,
            0x07 => Self::Ambient,
            other => {
                return Err(RpcError::InvalidArgument(format!("invalid audio input type {}", other)))
            }
        })
    }
}

/// Gain_Mode field of the Audio Input State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GainMode {
    ManualOnly = 0,
    AutomaticOnly = 1,
    Manual = 2,
    Automatic = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mute {
    NotMuted = 0,
    Muted = 1,
    Disabled = 2,
}

/// Gain Setting Properties characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GainSettingsProperties {
    /// Size of one gain step, in 0.1 dB
    pub units: u8,
    pub min: i8,
    pub max: i8,
}

/// Audio Input State characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioInputState {
    pub gain_setting: i8,
    pub mute: Mute,
    pub gain_mode: GainMode,
    pub change_counter: u8,
}

impl Default for AudioInputState {
    fn default() -> Self {
        Self {
            gain_setting: 0,
            mute: Mute::NotMuted,
            gain_mode: GainMode::Manual,
            change_counter: 0,
        }
    }
}

/// Server-side configuration of one AICS instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AicsServiceConfig {
    pub input_type: AudioInputType,
    pub description: String,
    pub gain_settings: GainSettingsProperties,
    pub state: AudioInputState,
}

impl Default for AicsServiceConfig {
    fn default() -> Self {
        Self {
            input_type: AudioInputType::Unspecified,
            description: String::new(),
            gain_settings: GainSettingsProperties { units: 1, min: -128, max: 127 },
            state: AudioInputState::default(),
        }
    }
}

impl AicsServiceConfig {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input_type(mut self, input_type: AudioInputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn with_gain_settings(mut self, units: u8, min: i8, max: i8) -> Self {
        self.gain_settings = GainSettingsProperties { units, min, max };
        self
    }

    pub fn with_state(mut self, gain_setting: i8, gain_mode: GainMode, mute: Mute) -> Self {
        self.state = AudioInputState {
            gain_setting,
            mute,
            gain_mode,
            change_counter: self.state.change_counter,
        };
        self
    }

    /// Check that the gain setting lies within the advertised bounds
    pub fn validate(&self) -> Result<(), RpcError> {
        let GainSettingsProperties { min, max, .. } = self.gain_settings;
        if min > max {
            return Err(RpcError::InvalidArgument(format!(
                "gain setting minimum {} exceeds maximum {}",
                min, max
            )));
        }
        if self.state.gain_setting < min || self.state.gain_setting > max {
            return Err(RpcError::InvalidArgument(format!(
                "gain setting {} outside {}..={}",
                self.state.gain_setting, min, max
            )));
        }
        Ok(())
    }
}
