//! Expected profile state, built fresh for every suite instance

use crate::bluetooth::uuids::HEARING_ACCESS_SERVICE;
use crate::bluetooth::{AddressType, AdvertiseRequest, DataTypes};
use crate::error::RpcError;
use crate::profiles::{
    AicsServiceConfig, AudioInputType, Availability, DynamicPresets, GainMode, HearingAccessServiceConfig,
    HearingAidFeatures, HearingAidType, IndependentPresets, Mute, PresetProperties, PresetRecord,
    PresetSynchronizationSupport, Writable, WritablePresetsSupport,
};

const LONG_NAME: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor \
                         incididunt ut labore et dolore magna aliqua.";

/// Name the reference advertises while hosting the Hearing Access Service
pub const HAP_ADVERTISING_NAME: &str = "Bumble";

/// Hearing Access Service hosted by the reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HapFixture {
    pub features: HearingAidFeatures,
    pub presets: Vec<PresetRecord>,
}

impl HapFixture {
    /// Monaural aid with four static presets at indices 1, 50, 5 and 7
    pub fn standard() -> Result<Self, RpcError> {
        let features = HearingAidFeatures {
            hearing_aid_type: HearingAidType::MonauralHearingAid,
            preset_synchronization_support: PresetSynchronizationSupport::NotSupported,
            independent_presets: IndependentPresets::IdenticalPresetRecord,
            dynamic_presets: DynamicPresets::PresetRecordsDoNotChange,
            writable_presets_support: WritablePresetsSupport::Supported,
        };

        let presets = vec![
            PresetRecord::new(1, "foo preset")?,
            PresetRecord::new(50, "bar preset")?,
            PresetRecord::new(5, format!("[{}]", &LONG_NAME[..38]))?,
            PresetRecord::with_properties(
                7,
                "unavailable preset",
                PresetProperties::new(Writable::CannotBeWritten, Availability::IsUnavailable),
            )?,
        ];

        Ok(Self { features, presets })
    }

    pub fn service_config(&self) -> Result<HearingAccessServiceConfig, RpcError> {
        HearingAccessServiceConfig::new(self.features, self.presets.clone())
    }

    /// Presets as a client must report them
    pub fn sorted_presets(&self) -> Vec<PresetRecord> {
        let mut presets = self.presets.clone();
        presets.sort_by_key(|preset| preset.index);
        presets
    }

    /// Connectable advertisement listing the Hearing Access Service
    pub fn advertise_request(&self) -> AdvertiseRequest {
        AdvertiseRequest::connectable(
            AddressType::Random,
            DataTypes::with_name(HAP_ADVERTISING_NAME).with_service_uuid16(HEARING_ACCESS_SERVICE),
        )
    }
}

/// Audio Input Control Service hosted by the reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AicsFixture {
    pub service: AicsServiceConfig,
}

impl AicsFixture {
    pub fn standard() -> Self {
        Self {
            service: AicsServiceConfig::default()
                .with_input_type(AudioInputType::Microphone)
                .with_description("Microphone")
                .with_gain_settings(1, -50, 50)
                .with_state(0, GainMode::Manual, Mute::NotMuted),
        }
    }

    /// Legacy connectable advertisement from the public address
    pub fn advertise_request(&self) -> AdvertiseRequest {
        AdvertiseRequest::default()
    }
}
