//! Mock implementations of the peer RPC interfaces

use async_trait::async_trait;
use mockall::mock;

use profile_harness::bluetooth::{
    Address, AddressType, AdvertiseRequest, AdvertiseStream, ConnectResult, Connection, Gatt,
    GattServiceDescriptor, Hap, Host, OwnAddressType, RpcPresetRecord, ScanStream,
};
use profile_harness::config::DeviceKind;
use profile_harness::harness::{DeviceDescriptor, DeviceRole, LinkRole};
use profile_harness::RpcError;

mock! {
    pub HostStack {}

    #[async_trait]
    impl Host for HostStack {
        async fn reset(&self) -> Result<(), RpcError>;
        async fn advertise(&self, request: AdvertiseRequest) -> Result<AdvertiseStream, RpcError>;
        async fn scan(&self, own_address_type: OwnAddressType) -> Result<ScanStream, RpcError>;
        async fn connect(
            &self,
            address: Address,
            address_type: AddressType,
            own_address_type: OwnAddressType,
        ) -> Result<ConnectResult, RpcError>;
    }
}

mock! {
    pub GattClient {}

    #[async_trait]
    impl Gatt for GattClient {
        async fn exchange_mtu(&self, mtu: u16, connection: &Connection) -> Result<u16, RpcError>;
        async fn discover_services(&self, connection: &Connection) -> Result<Vec<GattServiceDescriptor>, RpcError>;
    }
}

mock! {
    pub HapClient {}

    #[async_trait]
    impl Hap for HapClient {
        async fn get_features(&self, connection: &Connection) -> Result<Vec<u8>, RpcError>;
        async fn get_all_preset_records(&self, connection: &Connection) -> Result<Vec<RpcPresetRecord>, RpcError>;
        async fn wait_peripheral(&self, connection: &Connection) -> Result<(), RpcError>;
    }
}

/// Platform-kind central backed by mocks
pub fn mock_dut(host: MockHostStack) -> DeviceRole {
    DeviceRole::new(
        "dut",
        Address::new([0xC0, 0, 0, 0, 0, 1]),
        LinkRole::Central,
        DeviceDescriptor::for_kind(DeviceKind::Platform),
        std::sync::Arc::new(host),
    )
}

/// Host mock whose reset always succeeds
pub fn idle_host() -> MockHostStack {
    let mut host = MockHostStack::new();
    host.expect_reset().returning(|| Ok(()));
    host
}
