use std::sync::Arc;
use std::time::Duration;

use mockall::predicate::*;
use pretty_assertions::assert_eq;

use profile_harness::bluetooth::uuids::{self, AICS_CHARACTERISTICS, AUDIO_INPUT_CONTROL_SERVICE};
use profile_harness::bluetooth::{Address, Connection, GattServiceDescriptor, LinkId, RpcPresetRecord};
use profile_harness::harness::{DeviceRole, ProfileVerifier};
use profile_harness::profiles::PresetRecord;
use profile_harness::suites::HapFixture;
use profile_harness::{ErrorCategory, HarnessError};

use super::mocks::{idle_host, mock_dut, MockGattClient, MockHapClient};

fn connection() -> Connection {
    Connection {
        link: LinkId(1),
        local: Address::new([0xC0, 0, 0, 0, 0, 1]),
        peer: Address::new([0xC0, 0, 0, 0, 0, 2]),
    }
}

fn verifier() -> ProfileVerifier {
    ProfileVerifier::new(Duration::from_secs(1))
}

fn rpc_records(presets: &[PresetRecord]) -> Vec<RpcPresetRecord> {
    presets.iter().map(RpcPresetRecord::from).collect()
}

/// DUT whose HAP client reports `records`
fn dut_reporting(records: Vec<RpcPresetRecord>) -> DeviceRole {
    let mut hap = MockHapClient::new();
    hap.expect_get_all_preset_records()
        .withf(|connection| connection.link == LinkId(1))
        .times(1)
        .returning(move |_| Ok(records.clone()));
    mock_dut(idle_host()).with_hap(Arc::new(hap))
}

fn assertion_category(result: Result<(), HarnessError>) -> Option<ErrorCategory> {
    result.err().map(|e| e.category())
}

#[tokio::test]
async fn test_identical_presets_pass() {
    let fixture = HapFixture::standard().unwrap();
    let dut = dut_reporting(rpc_records(&fixture.sorted_presets()));

    let result = verifier().verify_presets(&dut, &connection(), &fixture.presets).await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_missing_preset_fails() {
    let fixture = HapFixture::standard().unwrap();
    let mut reported = fixture.sorted_presets();
    reported.pop();
    let dut = dut_reporting(rpc_records(&reported));

    let result = verifier().verify_presets(&dut, &connection(), &fixture.presets).await;
    assert_eq!(assertion_category(result), Some(ErrorCategory::Assertion));
}

#[tokio::test]
async fn test_unsorted_presets_fail() {
    let fixture = HapFixture::standard().unwrap();
    // Insertion order instead of index order
    let dut = dut_reporting(rpc_records(&fixture.presets));

    let result = verifier().verify_presets(&dut, &connection(), &fixture.presets).await;
    match result {
        Err(HarnessError::Assertion(failure)) => assert_eq!(failure.what, "preset record at position 1"),
        other => panic!("expected an assertion failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_changed_field_fails() {
    let fixture = HapFixture::standard().unwrap();
    let mut reported = rpc_records(&fixture.sorted_presets());
    reported[2].is_available = true;
    let dut = dut_reporting(reported);

    let result = verifier().verify_presets(&dut, &connection(), &fixture.presets).await;
    assert_eq!(assertion_category(result), Some(ErrorCategory::Assertion));
}

#[tokio::test]
async fn test_invalid_record_is_a_sequence_error() {
    let dut = dut_reporting(vec![RpcPresetRecord {
        index: 300,
        name: "too far".to_string(),
        is_writable: false,
        is_available: true,
    }]);

    let result = verifier().verify_presets(&dut, &connection(), &[]).await;
    assert_eq!(assertion_category(result), Some(ErrorCategory::Sequence));
}

#[tokio::test]
async fn test_features_must_match_exactly() {
    let fixture = HapFixture::standard().unwrap();
    let mut reported = fixture.features.to_bytes();
    let mut hap = MockHapClient::new();
    // Binaural instead of monaural
    reported[0] &= !0b11;
    hap.expect_get_features().returning(move |_| Ok(reported.clone()));
    let dut = mock_dut(idle_host()).with_hap(Arc::new(hap));

    let result = verifier().verify_features(&dut, &connection(), &fixture.features).await;
    assert_eq!(assertion_category(result), Some(ErrorCategory::Assertion));

    let mut hap = MockHapClient::new();
    let bytes = fixture.features.to_bytes();
    hap.expect_get_features().returning(move |_| Ok(bytes.clone()));
    let dut = mock_dut(idle_host()).with_hap(Arc::new(hap));
    assert_eq!(verifier().verify_features(&dut, &connection(), &fixture.features).await, Ok(()));
}

fn gatt_reporting(services: Vec<GattServiceDescriptor>) -> DeviceRole {
    let mut gatt = MockGattClient::new();
    gatt.expect_discover_services()
        .returning(move |_| Ok(services.clone()));
    gatt.expect_exchange_mtu()
        .with(eq(512), always())
        .returning(|mtu, _| Ok(mtu));
    mock_dut(idle_host()).with_gatt(Arc::new(gatt))
}

#[tokio::test]
async fn test_service_discovery() {
    let aics = GattServiceDescriptor {
        handle: 3,
        uuid: AUDIO_INPUT_CONTROL_SERVICE,
        characteristics: AICS_CHARACTERISTICS[..4].to_vec(),
    };
    let dut = gatt_reporting(vec![aics]);

    let services = verifier()
        .verify_service_discovered(&dut, &connection(), AUDIO_INPUT_CONTROL_SERVICE)
        .await
        .unwrap();
    assert_eq!(services.len(), 1);

    let missing = verifier()
        .verify_service_discovered(&dut, &connection(), uuids::HEARING_ACCESS_SERVICE)
        .await;
    assert!(matches!(missing, Err(HarnessError::Assertion(_))));

    // Two characteristics are missing
    let partial = verifier()
        .verify_service_characteristics(&dut, &connection(), AUDIO_INPUT_CONTROL_SERVICE, &AICS_CHARACTERISTICS)
        .await;
    assert!(matches!(partial, Err(HarnessError::Assertion(_))));
}

#[tokio::test]
async fn test_missing_hap_interface_is_a_sequence_error() {
    let dut = mock_dut(idle_host());
    let fixture = HapFixture::standard().unwrap();

    let result = verifier().verify_features(&dut, &connection(), &fixture.features).await;
    assert_eq!(assertion_category(result), Some(ErrorCategory::Sequence));
}
