//! Assigned-number UUIDs used by the harness

use uuid::Uuid;

/// Bluetooth base UUID, `00000000-0000-1000-8000-00805F9B34FB`
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Expand a 16-bit assigned number onto the Bluetooth base UUID
pub const fn uuid16(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Recover the 16-bit form of a UUID built on the Bluetooth base UUID
pub fn to_uuid16(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let mask = !(0xFFFF_u128 << 96);
    if value & mask == BLUETOOTH_BASE_UUID && (value >> 112) == 0 {
        Some(((value >> 96) & 0xFFFF) as u16)
    } else {
        None
    }
}

/// Audio Input Control Service
pub const AUDIO_INPUT_CONTROL_SERVICE: Uuid = uuid16(0x1843);
/// Published Audio Capabilities Service
pub const PUBLISHED_AUDIO_CAPABILITIES_SERVICE: Uuid = uuid16(0x1850);
/// Audio Stream Control Service
pub const AUDIO_STREAM_CONTROL_SERVICE: Uuid = uuid16(0x184E);
/// Hearing Access Service
pub const HEARING_ACCESS_SERVICE: Uuid = uuid16(0x1854);

// AICS characteristics
pub const AUDIO_INPUT_STATE: Uuid = uuid16(0x2B77);
pub const GAIN_SETTINGS_ATTRIBUTE: Uuid = uuid16(0x2B78);
pub const AUDIO_INPUT_TYPE: Uuid = uuid16(0x2B79);
pub const AUDIO_INPUT_STATUS: Uuid = uuid16(0x2B7A);
pub const AUDIO_INPUT_CONTROL_POINT: Uuid = uuid16(0x2B7B);
pub const AUDIO_INPUT_DESCRIPTION: Uuid = uuid16(0x2B7C);

// HAS characteristics
pub const HEARING_AID_FEATURES: Uuid = uuid16(0x2BDA);
pub const HEARING_AID_PRESET_CONTROL_POINT: Uuid = uuid16(0x2BDB);
pub const ACTIVE_PRESET_INDEX: Uuid = uuid16(0x2BDC);

/// Every characteristic an AICS instance exposes
pub const AICS_CHARACTERISTICS: [Uuid; 6] = [
    AUDIO_INPUT_STATE,
    GAIN_SETTINGS_ATTRIBUTE,
    AUDIO_INPUT_TYPE,
    AUDIO_INPUT_STATUS,
    AUDIO_INPUT_CONTROL_POINT,
    AUDIO_INPUT_DESCRIPTION,
];

/// Every characteristic a HAS instance exposes
pub const HAS_CHARACTERISTICS: [Uuid; 3] = [
    HEARING_AID_FEATURES,
    HEARING_AID_PRESET_CONTROL_POINT,
    ACTIVE_PRESET_INDEX,
];
