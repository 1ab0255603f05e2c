//! Profile data models held by reference services and reported to clients

pub mod aics;
pub mod hap;

pub use aics::{AicsServiceConfig, AudioInputType, GainMode, Mute};
pub use hap::{
    to_domain_presets, Availability, DynamicPresets, HearingAccessServiceConfig, HearingAidFeatures,
    HearingAidType, IndependentPresets, PresetProperties, PresetRecord, PresetSynchronizationSupport,
    Writable, WritablePresetsSupport,
};
