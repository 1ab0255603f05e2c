use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use profile_harness::bluetooth::uuids::HEARING_ACCESS_SERVICE;
use profile_harness::bluetooth::{AddressType, AdvertiseRequest, CancellableStream, DataTypes, ScanningResponse};
use profile_harness::config::DeviceKind;
use profile_harness::harness::{LinkRole, ScanFilter};

use super::common_utils::{dut_and_ref, init_logging, sim_role};

#[tokio::test]
async fn test_scan_yields_only_matching_advertisements() {
    init_logging();
    let (air, dut, reference) = dut_and_ref();
    let plain = sim_role(&air, "plain", 3, DeviceKind::SimulatedStack, LinkRole::Peripheral);
    let named = sim_role(&air, "named", 4, DeviceKind::SimulatedStack, LinkRole::Peripheral);

    // Registered before the matching one, so a non-filtering scan sees them first
    let _plain = plain
        .role
        .advertise(AdvertiseRequest::connectable(AddressType::Random, DataTypes::default()))
        .await
        .unwrap();
    let _named = named
        .role
        .advertise(AdvertiseRequest::connectable(AddressType::Random, DataTypes::with_name("Bumble")))
        .await
        .unwrap();
    let _has = reference
        .role
        .advertise(AdvertiseRequest::connectable(
            AddressType::Random,
            DataTypes::with_name("Bumble").with_service_uuid16(HEARING_ACCESS_SERVICE),
        ))
        .await
        .unwrap();

    let cases: Vec<(ScanFilter, fn(&ScanningResponse) -> bool)> = vec![
        (ScanFilter::service_uuid16(HEARING_ACCESS_SERVICE), |r| {
            r.data.has_service_uuid16(&HEARING_ACCESS_SERVICE)
        }),
        (ScanFilter::local_name("Bumble"), |r| {
            r.data.complete_local_name.as_deref() == Some("Bumble")
        }),
        (
            ScanFilter::custom(|r| r.data.complete_local_name.is_none()),
            |r| r.data.complete_local_name.is_none(),
        ),
    ];

    for (filter, holds) in cases {
        let label = format!("{:?}", filter);
        let mut scan = dut.role.scan(filter).await.unwrap();
        // More than one pass over the advertisers
        for _ in 0..4 {
            let response = scan.next_match().await.unwrap();
            assert!(holds(&response), "{} yielded {:?}", label, response);
        }
        scan.cancel();
    }

    // Filtered scans never hand out non-matching advertisements
    let mut scan = dut.role.scan(ScanFilter::service_uuid16(HEARING_ACCESS_SERVICE)).await.unwrap();
    for _ in 0..5 {
        let response = scan.next_match().await.unwrap();
        assert!(response.data.has_service_uuid16(&HEARING_ACCESS_SERVICE));
        assert_eq!(response.address, reference.role.address());
    }
    scan.cancel();
    assert_eq!(air.active_scans(), 0);
}

#[tokio::test]
async fn test_double_cancel_is_harmless() {
    let (air, dut, reference) = dut_and_ref();

    let mut advertisement = reference.role.advertise(AdvertiseRequest::default()).await.unwrap();
    let mut scan = dut.role.scan(ScanFilter::all()).await.unwrap();
    assert_eq!(air.active_advertisements(), 1);
    assert_eq!(air.active_scans(), 1);

    advertisement.cancel();
    advertisement.cancel();
    scan.cancel();
    scan.cancel();

    assert!(scan.is_cancelled());
    assert_eq!(air.active_advertisements(), 0);
    assert_eq!(air.active_scans(), 0);
    assert!(advertisement.next_event().await.is_none());
    assert!(scan.next_match().await.is_none());
}

#[tokio::test]
async fn test_release_hook_runs_once() {
    let released = Arc::new(AtomicUsize::new(0));
    let hook = released.clone();
    let mut stream = CancellableStream::new("test", futures::stream::iter(vec![1, 2, 3]), move || {
        hook.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(stream.next_event().await, Some(1));
    stream.cancel();
    stream.cancel();
    drop(stream);

    assert_eq!(released.load(Ordering::SeqCst), 1);
}
