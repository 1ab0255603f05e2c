//! Device role handles
//!
//! A [`DeviceRole`] is the harness's only view of a peer: its address, the
//! role it plays on the link, a statically declared descriptor of what it
//! can do, and handles to the RPC interfaces that descriptor promises.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use log::debug;
use uuid::Uuid;

use crate::bluetooth::{
    Address, AddressType, AdvertiseRequest, AdvertiseStream, ConnectResult, Connection, Gatt,
    GattServiceDescriptor, Hap, Host, OwnAddressType, RpcPresetRecord, ScanStream, ScanningResponse,
    Security, SecurityLevel, SecurityResult, ServiceConfigurator,
};
use crate::config::DeviceKind;
use crate::error::{RpcError, SetupError};
use crate::profiles::{AicsServiceConfig, HearingAccessServiceConfig};

bitflags! {
    /// Operations a peer supports
    pub struct Capabilities: u32 {
        const HOST = 1 << 0;
        const SECURITY = 1 << 1;
        const GATT_CLIENT = 1 << 2;
        const GATT_SERVER = 1 << 3;
        const HAP_CLIENT = 1 << 4;
        const SERVICE_CONFIG = 1 << 5;
        const SIMULATED_STACK = 1 << 6;
    }
}

const CAPABILITY_NAMES: [(Capabilities, &str); 7] = [
    (Capabilities::HOST, "host"),
    (Capabilities::SECURITY, "security"),
    (Capabilities::GATT_CLIENT, "gatt-client"),
    (Capabilities::GATT_SERVER, "gatt-server"),
    (Capabilities::HAP_CLIENT, "hap-client"),
    (Capabilities::SERVICE_CONFIG, "service-config"),
    (Capabilities::SIMULATED_STACK, "simulated-stack"),
];

impl Capabilities {
    /// Comma-separated capability names
    pub fn names(&self) -> String {
        CAPABILITY_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Static description of a peer, declared when the role is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub kind: DeviceKind,
    pub capabilities: Capabilities,
}

impl DeviceDescriptor {
    /// Descriptor implied by a device kind
    pub fn for_kind(kind: DeviceKind) -> Self {
        let capabilities = match kind {
            DeviceKind::SimulatedStack => {
                Capabilities::HOST
                    | Capabilities::SECURITY
                    | Capabilities::GATT_CLIENT
                    | Capabilities::GATT_SERVER
                    | Capabilities::SERVICE_CONFIG
                    | Capabilities::SIMULATED_STACK
            }
            DeviceKind::Platform => {
                Capabilities::HOST | Capabilities::SECURITY | Capabilities::GATT_CLIENT | Capabilities::HAP_CLIENT
            }
        };
        Self { kind, capabilities }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Role a peer plays on the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Central,
    Peripheral,
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRole::Central => f.write_str("central"),
            LinkRole::Peripheral => f.write_str("peripheral"),
        }
    }
}

/// Predicate over observed advertisements
pub enum ScanFilter {
    /// Accept every advertisement
    All,
    /// Advertisements listing a 16-bit service UUID
    ServiceUuid16(Uuid),
    /// Advertisements carrying a complete local name
    LocalName(String),
    /// Custom predicate
    Custom(Box<dyn Fn(&ScanningResponse) -> bool + Send + Sync + 'static>),
}

impl fmt::Debug for ScanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "ScanFilter::All"),
            Self::ServiceUuid16(uuid) => write!(f, "ScanFilter::ServiceUuid16({})", uuid),
            Self::LocalName(name) => write!(f, "ScanFilter::LocalName({:?})", name),
            Self::Custom(_) => write!(f, "ScanFilter::Custom(<function>)"),
        }
    }
}

impl ScanFilter {
    pub fn all() -> Self {
        Self::All
    }

    pub fn service_uuid16(uuid: Uuid) -> Self {
        Self::ServiceUuid16(uuid)
    }

    pub fn local_name(name: impl Into<String>) -> Self {
        Self::LocalName(name.into())
    }

    pub fn custom<F>(filter_fn: F) -> Self
    where
        F: Fn(&ScanningResponse) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Box::new(filter_fn))
    }

    /// Check if an advertisement matches this filter
    pub fn matches(&self, response: &ScanningResponse) -> bool {
        match self {
            Self::All => true,
            Self::ServiceUuid16(uuid) => response.data.has_service_uuid16(uuid),
            Self::LocalName(name) => response.data.complete_local_name.as_deref() == Some(name.as_str()),
            Self::Custom(filter_fn) => filter_fn(response),
        }
    }
}

/// A scan that only yields advertisements accepted by its filter
#[derive(Debug)]
pub struct FilteredScan {
    stream: ScanStream,
    filter: ScanFilter,
}

impl FilteredScan {
    pub fn new(stream: ScanStream, filter: ScanFilter) -> Self {
        Self { stream, filter }
    }

    /// Next matching advertisement; `None` once the scan is cancelled or ends
    pub async fn next_match(&mut self) -> Option<ScanningResponse> {
        while let Some(response) = self.stream.next_event().await {
            if self.filter.matches(&response) {
                return Some(response);
            }
        }
        None
    }

    /// Release the scan; safe to call repeatedly
    pub fn cancel(&mut self) {
        self.stream.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.stream.is_cancelled()
    }
}

/// Handle on one peer, owned by the test runner
#[derive(Clone)]
pub struct DeviceRole {
    label: String,
    address: Address,
    link_role: LinkRole,
    descriptor: DeviceDescriptor,
    host: Arc<dyn Host>,
    security: Option<Arc<dyn Security>>,
    gatt: Option<Arc<dyn Gatt>>,
    hap: Option<Arc<dyn Hap>>,
    services: Option<Arc<dyn ServiceConfigurator>>,
}

impl fmt::Debug for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRole")
            .field("label", &self.label)
            .field("address", &self.address)
            .field("link_role", &self.link_role)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl DeviceRole {
    /// Create a role with only the host interface installed
    pub fn new(
        label: impl Into<String>,
        address: Address,
        link_role: LinkRole,
        descriptor: DeviceDescriptor,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            label: label.into(),
            address,
            link_role,
            descriptor,
            host,
            security: None,
            gatt: None,
            hap: None,
            services: None,
        }
    }

    /// Create a role over a stack implementing every interface
    ///
    /// Only the interfaces the descriptor declares are installed.
    pub fn from_stack<S>(
        label: impl Into<String>,
        address: Address,
        link_role: LinkRole,
        descriptor: DeviceDescriptor,
        stack: Arc<S>,
    ) -> Self
    where
        S: Host + Security + Gatt + Hap + ServiceConfigurator + 'static,
    {
        let caps = descriptor.capabilities;
        let mut role = Self::new(label, address, link_role, descriptor, stack.clone());
        if caps.contains(Capabilities::SECURITY) {
            role.security = Some(stack.clone());
        }
        if caps.contains(Capabilities::GATT_CLIENT) {
            role.gatt = Some(stack.clone());
        }
        if caps.contains(Capabilities::HAP_CLIENT) {
            role.hap = Some(stack.clone());
        }
        if caps.contains(Capabilities::SERVICE_CONFIG) {
            role.services = Some(stack);
        }
        role
    }

    pub fn with_security(mut self, security: Arc<dyn Security>) -> Self {
        self.security = Some(security);
        self
    }

    pub fn with_gatt(mut self, gatt: Arc<dyn Gatt>) -> Self {
        self.gatt = Some(gatt);
        self
    }

    pub fn with_hap(mut self, hap: Arc<dyn Hap>) -> Self {
        self.hap = Some(hap);
        self
    }

    pub fn with_service_configurator(mut self, services: Arc<dyn ServiceConfigurator>) -> Self {
        self.services = Some(services);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn link_role(&self) -> LinkRole {
        self.link_role
    }

    pub fn descriptor(&self) -> DeviceDescriptor {
        self.descriptor
    }

    pub fn has(&self, capabilities: Capabilities) -> bool {
        self.descriptor.capabilities.contains(capabilities)
    }

    /// Fail with a setup error naming every missing capability
    pub fn require(&self, capabilities: Capabilities) -> Result<(), SetupError> {
        let missing = capabilities - self.descriptor.capabilities;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SetupError::MissingCapability {
                role: self.label.clone(),
                missing: missing.names(),
            })
        }
    }

    fn unsupported(&self, interface: &'static str) -> RpcError {
        RpcError::Unsupported {
            peer: self.label.clone(),
            interface,
        }
    }

    fn security(&self) -> Result<&Arc<dyn Security>, RpcError> {
        self.security.as_ref().ok_or_else(|| self.unsupported("security"))
    }

    fn gatt(&self) -> Result<&Arc<dyn Gatt>, RpcError> {
        self.gatt.as_ref().ok_or_else(|| self.unsupported("gatt"))
    }

    fn hap(&self) -> Result<&Arc<dyn Hap>, RpcError> {
        self.hap.as_ref().ok_or_else(|| self.unsupported("hap"))
    }

    fn service_configurator(&self) -> Result<&Arc<dyn ServiceConfigurator>, RpcError> {
        self.services.as_ref().ok_or_else(|| self.unsupported("service configuration"))
    }

    /// Bring the peer back to a clean state
    pub async fn reset(&self) -> Result<(), SetupError> {
        self.host.reset().await.map_err(|source| SetupError::Reset {
            role: self.label.clone(),
            source,
        })?;
        debug!("{} reset", self.label);
        Ok(())
    }

    pub async fn advertise(&self, request: AdvertiseRequest) -> Result<AdvertiseStream, RpcError> {
        self.host.advertise(request).await
    }

    /// Scan with a random own address, yielding only matching advertisements
    pub async fn scan(&self, filter: ScanFilter) -> Result<FilteredScan, RpcError> {
        self.scan_with(AddressType::Random, filter).await
    }

    pub async fn scan_with(&self, own_address_type: OwnAddressType, filter: ScanFilter) -> Result<FilteredScan, RpcError> {
        let stream = self.host.scan(own_address_type).await?;
        Ok(FilteredScan::new(stream, filter))
    }

    pub async fn connect(
        &self,
        address: Address,
        address_type: AddressType,
        own_address_type: OwnAddressType,
    ) -> Result<ConnectResult, RpcError> {
        self.host.connect(address, address_type, own_address_type).await
    }

    pub async fn secure(&self, connection: &Connection, level: SecurityLevel) -> Result<SecurityResult, RpcError> {
        self.security()?.secure(connection, level).await
    }

    pub async fn wait_security(&self, connection: &Connection, level: SecurityLevel) -> Result<SecurityResult, RpcError> {
        self.security()?.wait_security(connection, level).await
    }

    pub async fn exchange_mtu(&self, mtu: u16, connection: &Connection) -> Result<u16, RpcError> {
        self.gatt()?.exchange_mtu(mtu, connection).await
    }

    pub async fn discover_services(&self, connection: &Connection) -> Result<Vec<GattServiceDescriptor>, RpcError> {
        self.gatt()?.discover_services(connection).await
    }

    pub async fn get_features(&self, connection: &Connection) -> Result<Vec<u8>, RpcError> {
        self.hap()?.get_features(connection).await
    }

    pub async fn get_all_preset_records(&self, connection: &Connection) -> Result<Vec<RpcPresetRecord>, RpcError> {
        self.hap()?.get_all_preset_records(connection).await
    }

    pub async fn wait_peripheral(&self, connection: &Connection) -> Result<(), RpcError> {
        self.hap()?.wait_peripheral(connection).await
    }

    pub async fn add_hearing_access_service(&self, config: HearingAccessServiceConfig) -> Result<(), RpcError> {
        self.service_configurator()?.add_hearing_access_service(config).await
    }

    pub async fn add_aics_service(&self, config: AicsServiceConfig) -> Result<(), RpcError> {
        self.service_configurator()?.add_aics_service(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::DataTypes;
    use crate::bluetooth::uuids::HEARING_ACCESS_SERVICE;

    fn response(data: DataTypes) -> ScanningResponse {
        ScanningResponse {
            address: Address::new([1, 2, 3, 4, 5, 6]),
            address_type: AddressType::Random,
            legacy: true,
            connectable: true,
            data,
            rssi: -40,
        }
    }

    #[test]
    fn test_descriptor_for_kind() {
        let reference = DeviceDescriptor::for_kind(DeviceKind::SimulatedStack);
        assert!(reference.capabilities.contains(Capabilities::SIMULATED_STACK));
        assert!(!reference.capabilities.contains(Capabilities::HAP_CLIENT));

        let dut = DeviceDescriptor::for_kind(DeviceKind::Platform);
        assert!(dut.capabilities.contains(Capabilities::HAP_CLIENT));
        assert!(!dut.capabilities.contains(Capabilities::SIMULATED_STACK));
    }

    #[test]
    fn test_capability_names() {
        let caps = Capabilities::HOST | Capabilities::HAP_CLIENT;
        assert_eq!(caps.names(), "host, hap-client");
    }

    #[test]
    fn test_service_uuid_filter() {
        let filter = ScanFilter::service_uuid16(HEARING_ACCESS_SERVICE);
        assert!(filter.matches(&response(DataTypes::with_name("Bumble").with_service_uuid16(HEARING_ACCESS_SERVICE))));
        assert!(!filter.matches(&response(DataTypes::with_name("Bumble"))));
    }

    #[test]
    fn test_local_name_and_custom_filters() {
        let named = response(DataTypes::with_name("Bumble"));
        assert!(ScanFilter::local_name("Bumble").matches(&named));
        assert!(!ScanFilter::local_name("Other").matches(&named));
        assert!(ScanFilter::custom(|r| r.rssi > -50).matches(&named));
        assert!(ScanFilter::all().matches(&named));
    }
}
