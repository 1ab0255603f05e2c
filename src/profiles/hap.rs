//! Hearing Access Service data model
//!
//! Preset records and the Hearing Aid Features octet, as held by a Hearing
//! Access Service server and as reported back to a HAP client.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use crate::bluetooth::RpcPresetRecord;
use crate::error::{RpcError, SequenceError};

/// Longest preset name, in octets
pub const MAX_PRESET_NAME_LEN: usize = 40;

/// Hearing aid type, bits 0-1 of the features octet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HearingAidType {
    BinauralHearingAid = 0,
    MonauralHearingAid = 1,
    BandedHearingAid = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetSynchronizationSupport {
    NotSupported = 0,
    Supported = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndependentPresets {
    IdenticalPresetRecord = 0,
    DifferentPresetRecord = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicPresets {
    PresetRecordsDoNotChange = 0,
    PresetRecordsMayChange = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritablePresetsSupport {
    NotSupported = 0,
    Supported = 1,
}

/// Decoded Hearing Aid Features characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HearingAidFeatures {
    pub hearing_aid_type: HearingAidType,
    pub preset_synchronization_support: PresetSynchronizationSupport,
    pub independent_presets: IndependentPresets,
    pub dynamic_presets: DynamicPresets,
    pub writable_presets_support: WritablePresetsSupport,
}

impl HearingAidFeatures {
    /// Decode the characteristic value; only the first octet is meaningful
    pub fn from_bytes(data: &[u8]) -> Result<Self, SequenceError> {
        let octet = *data
            .first()
            .ok_or_else(|| SequenceError::InvalidData("empty Hearing Aid Features value".to_string()))?;

        let hearing_aid_type = match octet & 0b11 {
            0 => HearingAidType::BinauralHearingAid,
            1 => HearingAidType::MonauralHearingAid,
            2 => HearingAidType::BandedHearingAid,
            other => {
                return Err(SequenceError::InvalidData(format!(
                    "reserved hearing aid type {}",
                    other
                )))
            }
        };

        let bit = |n: u8| octet & (1 << n) != 0;

        Ok(Self {
            hearing_aid_type,
            preset_synchronization_support: if bit(2) {
                PresetSynchronizationSupport::Supported
            } else {
                PresetSynchronizationSupport::NotSupported
            },
            independent_presets: if bit(3) {
                IndependentPresets::DifferentPresetRecord
            } else {
                IndependentPresets::IdenticalPresetRecord
            },
            dynamic_presets: if bit(4) {
                DynamicPresets::PresetRecordsMayChange
            } else {
                DynamicPresets::PresetRecordsDoNotChange
            },
            writable_presets_support: if bit(5) {
                WritablePresetsSupport::Supported
            } else {
                WritablePresetsSupport::NotSupported
            },
        })
    }

    /// Encode as the one-octet characteristic value
    pub fn to_bytes(&self) -> Vec<u8> {
        let octet = self.hearing_aid_type as u8
            | (self.preset_synchronization_support as u8) << 2
            | (self.independent_presets as u8) << 3
            | (self.dynamic_presets as u8) << 4
            | (self.writable_presets_support as u8) << 5;
        vec![octet]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Writable {
    CannotBeWritten = 0,
    CanBeWritten = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Availability {
    IsUnavailable = 0,
    IsAvailable = 1,
}

/// Properties field of a preset record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresetProperties {
    pub writable: Writable,
    pub available: Availability,
}

impl Default for PresetProperties {
    fn default() -> Self {
        Self {
            writable: Writable::CannotBeWritten,
            available: Availability::IsAvailable,
        }
    }
}

impl PresetProperties {
    pub fn new(writable: Writable, available: Availability) -> Self {
        Self { writable, available }
    }
}

/// A preset record held by a Hearing Access Service server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PresetRecord {
    pub index: u8,
    pub name: String,
    pub properties: PresetProperties,
}

impl PresetRecord {
    /// Record with default properties
    pub fn new(index: u8, name: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_properties(index, name, PresetProperties::default())
    }

    pub fn with_properties(
        index: u8,
        name: impl Into<String>,
        properties: PresetProperties,
    ) -> Result<Self, RpcError> {
        let name = name.into();
        validate_preset(index, &name)?;
        Ok(Self { index, name, properties })
    }
}

fn validate_preset(index: u8, name: &str) -> Result<(), RpcError> {
    if index == 0 {
        return Err(RpcError::InvalidArgument("preset index 0 is reserved".to_string()));
    }
    if name.is_empty() || name.len() > MAX_PRESET_NAME_LEN {
        return Err(RpcError::InvalidArgument(format!(
            "preset name must be 1..={} octets, got {}",
            MAX_PRESET_NAME_LEN,
            name.len()
        )));
    }
    Ok(())
}

impl TryFrom<&RpcPresetRecord> for PresetRecord {
    type Error = SequenceError;

    fn try_from(record: &RpcPresetRecord) -> Result<Self, Self::Error> {
        let index = u8::try_from(record.index)
            .map_err(|_| SequenceError::InvalidData(format!("preset index {} out of range", record.index)))?;

        let properties = PresetProperties {
            writable: if record.is_writable {
                Writable::CanBeWritten
            } else {
                Writable::CannotBeWritten
            },
            available: if record.is_available {
                Availability::IsAvailable
            } else {
                Availability::IsUnavailable
            },
        };

        PresetRecord::with_properties(index, record.name.clone(), properties)
            .map_err(|e| SequenceError::InvalidData(e.to_string()))
    }
}

impl From<&PresetRecord> for RpcPresetRecord {
    fn from(record: &PresetRecord) -> Self {
        Self {
            index: u32::from(record.index),
            name: record.name.clone(),
            is_writable: record.properties.writable == Writable::CanBeWritten,
            is_available: record.properties.available == Availability::IsAvailable,
        }
    }
}

/// Convert a list of RPC records, preserving order
pub fn to_domain_presets(records: &[RpcPresetRecord]) -> Result<Vec<PresetRecord>, SequenceError> {
    records.iter().map(PresetRecord::try_from).collect()
}

/// Server-side configuration of a Hearing Access Service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HearingAccessServiceConfig {
    pub server_features: HearingAidFeatures,
    preset_records: BTreeMap<u8, PresetRecord>,
}

impl HearingAccessServiceConfig {
    /// Build a configuration; duplicate preset indices are rejected
    pub fn new(server_features: HearingAidFeatures, presets: Vec<PresetRecord>) -> Result<Self, RpcError> {
        let mut preset_records = BTreeMap::new();
        for preset in presets {
            let index = preset.index;
            if preset_records.insert(index, preset).is_some() {
                return Err(RpcError::InvalidArgument(format!("duplicate preset index {}", index)));
            }
        }

        Ok(Self {
            server_features,
            preset_records,
        })
    }

    /// Preset records sorted by index
    pub fn sorted_presets(&self) -> Vec<PresetRecord> {
        self.preset_records.values().cloned().collect()
    }

    pub fn preset(&self, index: u8) -> Option<&PresetRecord> {
        self.preset_records.get(&index)
    }

    pub fn preset_count(&self) -> usize {
        self.preset_records.len()
    }
}
