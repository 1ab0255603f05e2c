use std::time::Duration;

use pretty_assertions::assert_eq;

use profile_harness::bluetooth::uuids::HEARING_ACCESS_SERVICE;
use profile_harness::bluetooth::{AdvertiseRequest, ConnectResult, DataTypes, AddressType, SecurityLevel};
use profile_harness::config::DeviceKind;
use profile_harness::harness::{LinkRole, ScanFilter, Sequencer};
use profile_harness::sim::{SimDeviceOptions, SimulatedAir};
use profile_harness::suites::HapFixture;
use profile_harness::SequenceError;

use super::common_utils::{dut_and_ref, fast_config, init_logging, sim_role, sim_role_with};
use super::mocks::{idle_host, mock_dut};

#[tokio::test]
async fn test_establish_exchanges_mtu_and_secures() {
    init_logging();
    let (air, dut, reference) = dut_and_ref();
    let fixture = HapFixture::standard().unwrap();
    reference
        .role
        .add_hearing_access_service(fixture.service_config().unwrap())
        .await
        .unwrap();

    let sequencer = Sequencer::new(fast_config());
    let pair = sequencer
        .establish(
            &dut.role,
            &reference.role,
            fixture.advertise_request(),
            ScanFilter::service_uuid16(HEARING_ACCESS_SERVICE),
        )
        .await
        .unwrap();

    assert!(pair.dut_ref.mirrors(&pair.ref_dut));
    assert_eq!(pair.dut_ref.peer, reference.role.address());
    assert_eq!(air.mtu(pair.dut_ref.link), Some(512));

    // The link is encrypted, so the HAP client can read the service
    sequencer.wait_peripheral(&dut.role, &pair).await.unwrap();
    assert!(air.is_hap_attached(pair.dut_ref.link));

    // Scan and advertisement were released by the sequence
    assert_eq!(air.active_scans(), 0);
    assert_eq!(air.active_advertisements(), 0);
}

#[tokio::test]
async fn test_secure_negotiates_lowest_mtu_limit() {
    init_logging();
    let air = SimulatedAir::new();
    let dut = sim_role(&air, "dut", 1, DeviceKind::Platform, LinkRole::Central);
    let reference = sim_role_with(
        &air,
        "ref",
        2,
        DeviceKind::SimulatedStack,
        LinkRole::Peripheral,
        SimDeviceOptions {
            max_mtu: 100,
            ..SimDeviceOptions::default()
        },
    );
    let sequencer = Sequencer::new(fast_config());
    assert_eq!(sequencer.config().mtu, 512);

    let pair = sequencer
        .connect_direct(&dut.role, &reference.role, AdvertiseRequest::default())
        .await
        .unwrap();
    let negotiated = sequencer.secure(&dut.role, &reference.role, &pair).await.unwrap();

    assert_eq!(negotiated, 100);
    assert_eq!(air.mtu(pair.dut_ref.link), Some(100));
}

#[tokio::test]
async fn test_connect_direct_is_symmetric() {
    init_logging();
    let (air, dut, reference) = dut_and_ref();
    let sequencer = Sequencer::new(fast_config());

    let pair = sequencer
        .connect_direct(&dut.role, &reference.role, AdvertiseRequest::default())
        .await
        .unwrap();

    assert_eq!(pair.dut_ref.link, pair.ref_dut.link);
    assert_eq!(pair.dut_ref.local, pair.ref_dut.peer);
    assert_eq!(pair.ref_dut.local, pair.dut_ref.peer);
    assert_eq!(air.active_links(), 1);
    assert_eq!(air.active_advertisements(), 0);
}

#[tokio::test]
async fn test_pairing_rejection_aborts_sequence() {
    init_logging();
    let (_air, dut, reference) = dut_and_ref();
    reference.device.set_reject_pairing(true);
    let sequencer = Sequencer::new(fast_config());

    let pair = sequencer
        .connect_direct(&dut.role, &reference.role, AdvertiseRequest::default())
        .await
        .unwrap();
    let result = sequencer.secure(&dut.role, &reference.role, &pair).await;

    assert_eq!(
        result,
        Err(SequenceError::FailureVariant {
            step: "secure",
            variant: "pairing_failure".to_string(),
        })
    );
}

#[tokio::test]
async fn test_scan_timeout_releases_streams() {
    init_logging();
    let (air, dut, reference) = dut_and_ref();
    let config = profile_harness::SequencerConfig {
        scan_timeout: Duration::from_millis(100),
        ..fast_config()
    };
    let sequencer = Sequencer::new(config);

    let result = sequencer
        .connect(
            &dut.role,
            &reference.role,
            AdvertiseRequest::connectable(AddressType::Random, DataTypes::with_name("Bumble")),
            ScanFilter::local_name("Nobody"),
        )
        .await;

    assert!(matches!(result, Err(SequenceError::Timeout { step: "scan", .. })));
    assert_eq!(air.active_scans(), 0);
    assert_eq!(air.active_advertisements(), 0);
    assert_eq!(air.active_links(), 0);
}

#[tokio::test]
async fn test_first_matching_advertisement_wins() {
    init_logging();
    let (air, dut, reference) = dut_and_ref();
    let other = sim_role(&air, "other", 3, DeviceKind::SimulatedStack, LinkRole::Peripheral);
    let request = AdvertiseRequest::connectable(
        AddressType::Random,
        DataTypes::with_name("Bumble").with_service_uuid16(HEARING_ACCESS_SERVICE),
    );

    // Registered first, so observed first
    let mut first = other.role.advertise(request.clone()).await.unwrap();
    let mut second = reference.role.advertise(request).await.unwrap();

    let mut scan = dut.role.scan(ScanFilter::service_uuid16(HEARING_ACCESS_SERVICE)).await.unwrap();
    let found = scan.next_match().await.unwrap();
    scan.cancel();
    assert_eq!(found.address, other.role.address());

    // The sequencer does not rank candidates either: it connects to the first
    // match, so the reference's own stream never yields an event
    let config = profile_harness::SequencerConfig {
        connect_timeout: Duration::from_millis(300),
        ..fast_config()
    };
    let result = Sequencer::new(config)
        .connect_advertised(
            &dut.role,
            &reference.role,
            &mut second,
            ScanFilter::service_uuid16(HEARING_ACCESS_SERVICE),
        )
        .await;

    assert!(matches!(result, Err(SequenceError::Timeout { step: "connect", .. })));
    let event = first.next_event().await.unwrap();
    assert_eq!(event.connection.peer, dut.role.address());
    first.cancel();
    assert_eq!(air.active_advertisements(), 0);
}

#[tokio::test]
async fn test_wrong_link_roles_are_rejected() {
    let (_air, dut, reference) = dut_and_ref();
    let sequencer = Sequencer::new(fast_config());

    let result = sequencer
        .connect_direct(&reference.role, &dut.role, AdvertiseRequest::default())
        .await;

    assert!(matches!(result, Err(SequenceError::RoleMismatch { expected: "central", .. })));
}

#[tokio::test]
async fn test_connect_failure_variant_fails_fast() {
    init_logging();
    let (air, _dut, reference) = dut_and_ref();
    let mut host = idle_host();
    host.expect_connect()
        .times(1)
        .returning(|_, _, _| Ok(ConnectResult::PeerNotFound));
    let dut = mock_dut(host);

    // Far shorter than the connect timeout would allow
    let started = std::time::Instant::now();
    let result = Sequencer::new(fast_config())
        .connect_direct(&dut, &reference.role, AdvertiseRequest::default())
        .await;

    assert_eq!(
        result,
        Err(SequenceError::FailureVariant {
            step: "connect",
            variant: "peer_not_found".to_string(),
        })
    );
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(air.active_advertisements(), 0);
}

#[tokio::test]
async fn test_missing_security_interface_is_an_rpc_error() {
    let (_air, _dut, reference) = dut_and_ref();
    let dut = mock_dut(idle_host());
    let pair = profile_harness::ConnectionPair::new(
        profile_harness::bluetooth::Connection {
            link: profile_harness::bluetooth::LinkId(9),
            local: dut.address(),
            peer: reference.role.address(),
        },
        profile_harness::bluetooth::Connection {
            link: profile_harness::bluetooth::LinkId(9),
            local: reference.role.address(),
            peer: dut.address(),
        },
    )
    .unwrap();

    let result = dut.secure(&pair.dut_ref, SecurityLevel::LeLevel3).await;
    assert!(matches!(result, Err(profile_harness::RpcError::Unsupported { interface: "security", .. })));
}
