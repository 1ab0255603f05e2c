//! A simulated peer implementing every harness interface

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::bluetooth::uuids::{self, AICS_CHARACTERISTICS, HAS_CHARACTERISTICS};
use crate::bluetooth::{
    Address, AddressType, AdvertiseRequest, AdvertiseStream, CancellableStream, ConnectResult,
    Connection, Gatt, GattServiceDescriptor, Hap, Host, OwnAddressType, RpcPresetRecord, ScanStream,
    Security, SecurityLevel, SecurityResult, ServiceConfigurator, ATT_DEFAULT_MTU, ATT_MAX_MTU,
};
use crate::error::RpcError;
use crate::profiles::{AicsServiceConfig, HearingAccessServiceConfig};
use crate::sim::air::{LinkSecurity, SimulatedAir};

/// Generic Access service
const GAP_SERVICE: u16 = 0x1800;
/// Generic Attribute service
const GATT_SERVICE: u16 = 0x1801;

/// Profile services and link parameters of one simulated device, as seen
/// by its peers
#[derive(Debug)]
pub struct DeviceServices {
    pub hearing_access: Option<HearingAccessServiceConfig>,
    pub aics: Vec<AicsServiceConfig>,
    /// Survives reset; set through [`SimDevice::set_reject_pairing`]
    pub reject_pairing: bool,
    /// Largest MTU the device accepts; survives reset
    pub max_mtu: u16,
}

impl Default for DeviceServices {
    fn default() -> Self {
        Self {
            hearing_access: None,
            aics: Vec::new(),
            reject_pairing: false,
            max_mtu: ATT_MAX_MTU,
        }
    }
}

impl DeviceServices {
    fn clear(&mut self) {
        self.hearing_access = None;
        self.aics.clear();
    }

    /// Primary services as GATT discovery reports them
    fn descriptors(&self) -> Vec<GattServiceDescriptor> {
        let mut services = vec![
            (uuids::uuid16(GAP_SERVICE), Vec::new()),
            (uuids::uuid16(GATT_SERVICE), Vec::new()),
        ];
        for _ in &self.aics {
            services.push((uuids::AUDIO_INPUT_CONTROL_SERVICE, AICS_CHARACTERISTICS.to_vec()));
        }
        if self.hearing_access.is_some() {
            services.push((uuids::HEARING_ACCESS_SERVICE, HAS_CHARACTERISTICS.to_vec()));
        }

        // One handle for the declaration plus two per characteristic
        let mut handle = 1u16;
        services
            .into_iter()
            .map(|(uuid, characteristics)| {
                let descriptor = GattServiceDescriptor {
                    handle,
                    uuid,
                    characteristics,
                };
                handle += 1 + 2 * descriptor.characteristics.len() as u16;
                descriptor
            })
            .collect()
    }
}

/// Behaviour knobs of a simulated device
#[derive(Debug, Clone)]
pub struct SimDeviceOptions {
    /// Largest MTU the device accepts
    pub max_mtu: u16,
    /// Pause between two passes over the advertisements while scanning
    pub scan_interval: Duration,
    /// Reject every pairing request on links to this device
    pub reject_pairing: bool,
}

impl Default for SimDeviceOptions {
    fn default() -> Self {
        Self {
            max_mtu: ATT_MAX_MTU,
            scan_interval: Duration::from_millis(20),
            reject_pairing: false,
        }
    }
}

/// A simulated Bluetooth peer attached to a [`SimulatedAir`]
pub struct SimDevice {
    label: String,
    address: Address,
    air: SimulatedAir,
    options: SimDeviceOptions,
    services: Arc<Mutex<DeviceServices>>,
    reachable: AtomicBool,
}

impl std::fmt::Debug for SimDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDevice")
            .field("label", &self.label)
            .field("address", &self.address)
            .finish()
    }
}

impl SimDevice {
    /// Create a device and attach it to the air
    pub fn new(
        label: impl Into<String>,
        address: Address,
        air: SimulatedAir,
        options: SimDeviceOptions,
    ) -> Result<Self, RpcError> {
        let services = Arc::new(Mutex::new(DeviceServices {
            reject_pairing: options.reject_pairing,
            max_mtu: options.max_mtu,
            ..DeviceServices::default()
        }));
        air.attach(address, services.clone())?;

        Ok(Self {
            label: label.into(),
            address,
            air,
            options,
            services,
            reachable: AtomicBool::new(true),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn air(&self) -> &SimulatedAir {
        &self.air
    }

    /// Make every subsequent call fail as if the peer had gone away
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_reject_pairing(&self, reject: bool) {
        self.services().reject_pairing = reject;
    }

    /// Detach from the air, dropping all advertisements and links
    pub fn shutdown(&self) {
        self.air.detach(self.address);
        info!("{} ({}) shut down", self.label, self.address);
    }

    fn services(&self) -> MutexGuard<'_, DeviceServices> {
        self.services.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reachable(&self) -> Result<(), RpcError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RpcError::Unreachable(self.label.clone()))
        }
    }

    /// Validate a connection cookie held by this device
    fn check_connection(&self, connection: &Connection) -> Result<(), RpcError> {
        self.check_reachable()?;
        if connection.local != self.address {
            return Err(RpcError::UnknownConnection(connection.to_string()));
        }
        self.air.validate(connection)
    }

    /// Hearing Access Service of the remote peer, once the link is encrypted
    fn remote_hearing_access(&self, connection: &Connection) -> Result<HearingAccessServiceConfig, RpcError> {
        self.check_connection(connection)?;

        if self.air.security_level(connection)? < SecurityLevel::LeLevel2 {
            return Err(RpcError::Profile("insufficient encryption".to_string()));
        }

        let remote = self
            .air
            .services_of(connection.peer)
            .ok_or_else(|| RpcError::Unreachable(connection.peer.to_string()))?;
        let remote = remote.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        remote
            .hearing_access
            .clone()
            .ok_or_else(|| RpcError::Profile(format!("{} has no Hearing Access Service", connection.peer)))
    }

    /// Pairing fails when either side rejects it or the peer is gone
    fn pairing_rejected(&self, connection: &Connection) -> bool {
        if self.services().reject_pairing {
            return true;
        }
        let remote = match self.air.services_of(connection.peer) {
            Some(remote) => remote,
            None => return true,
        };
        let rejects = remote.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).reject_pairing;
        rejects
    }

    /// MTU limit of the remote side of `connection`
    fn remote_max_mtu(&self, connection: &Connection) -> Result<u16, RpcError> {
        let remote = self
            .air
            .services_of(connection.peer)
            .ok_or_else(|| RpcError::Unreachable(connection.peer.to_string()))?;
        let max_mtu = remote.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).max_mtu;
        Ok(max_mtu)
    }
}

#[async_trait]
impl Host for SimDevice {
    async fn reset(&self) -> Result<(), RpcError> {
        self.check_reachable()?;
        self.air.drop_device_state(self.address);
        self.services().clear();
        debug!("{} reset", self.label);
        Ok(())
    }

    async fn advertise(&self, request: AdvertiseRequest) -> Result<AdvertiseStream, RpcError> {
        self.check_reachable()?;
        let (id, rx) = self.air.start_advertising(self.address, request);
        let air = self.air.clone();

        let stream = tokio_stream::wrappers::UnboundedReceiverStream::new(rx);
        Ok(CancellableStream::new("advertise", stream, move || air.stop_advertising(id)))
    }

    async fn scan(&self, own_address_type: OwnAddressType) -> Result<ScanStream, RpcError> {
        self.check_reachable()?;
        debug!("{} scanning with {:?} address", self.label, own_address_type);

        let air = self.air.clone();
        let observer = self.address;
        let interval = self.options.scan_interval;
        air.scan_started();

        let stream = async_stream::stream! {
            loop {
                for response in air.observe(observer) {
                    yield response;
                }
                tokio::time::sleep(interval).await;
            }
        };

        let release = self.air.clone();
        Ok(CancellableStream::new("scan", stream, move || release.scan_stopped()))
    }

    async fn connect(
        &self,
        address: Address,
        address_type: AddressType,
        own_address_type: OwnAddressType,
    ) -> Result<ConnectResult, RpcError> {
        self.check_reachable()?;
        debug!(
            "{} connecting to {} ({:?}) with {:?} address",
            self.label, address, address_type, own_address_type
        );
        Ok(self.air.connect(self.address, address, address_type))
    }
}

#[async_trait]
impl Security for SimDevice {
    async fn secure(&self, connection: &Connection, level: SecurityLevel) -> Result<SecurityResult, RpcError> {
        self.check_connection(connection)?;

        let current = self.air.security_level(connection)?;
        if current >= level {
            return Ok(SecurityResult::Success);
        }

        if self.pairing_rejected(connection) {
            warn!("{} pairing rejected on {}", self.label, connection);
            self.air.publish_security(
                connection,
                LinkSecurity {
                    level: current,
                    failure: Some(SecurityResult::PairingFailure),
                },
            )?;
            return Ok(SecurityResult::PairingFailure);
        }

        // Pairing yields the requested level; a peer cannot ask for less than encryption
        let reached = level.max(SecurityLevel::LeLevel2);
        self.air.publish_security(connection, LinkSecurity { level: reached, failure: None })?;
        info!("{} secured {} at {:?}", self.label, connection, reached);
        Ok(SecurityResult::Success)
    }

    async fn wait_security(
        &self,
        connection: &Connection,
        level: SecurityLevel,
    ) -> Result<SecurityResult, RpcError> {
        self.check_connection(connection)?;
        let mut updates = self.air.subscribe_security(connection)?;

        let outcome = updates
            .wait_for(|security| security.level >= level || security.failure.is_some())
            .await
            .map(|security| *security);

        Ok(match outcome {
            Ok(LinkSecurity { failure: Some(failure), .. }) => failure,
            Ok(_) => SecurityResult::Success,
            Err(_) => SecurityResult::ConnectionDied,
        })
    }
}

#[async_trait]
impl Gatt for SimDevice {
    async fn exchange_mtu(&self, mtu: u16, connection: &Connection) -> Result<u16, RpcError> {
        self.check_connection(connection)?;
        if !(ATT_DEFAULT_MTU..=ATT_MAX_MTU).contains(&mtu) {
            return Err(RpcError::InvalidArgument(format!("MTU {} out of range", mtu)));
        }

        // Both sides cap the result with their own limit
        let negotiated = mtu.min(self.options.max_mtu).min(self.remote_max_mtu(connection)?);
        self.air.set_mtu(connection, negotiated)?;
        debug!("{} negotiated MTU {} on {}", self.label, negotiated, connection);
        Ok(negotiated)
    }

    async fn discover_services(&self, connection: &Connection) -> Result<Vec<GattServiceDescriptor>, RpcError> {
        self.check_connection(connection)?;
        let remote = self
            .air
            .services_of(connection.peer)
            .ok_or_else(|| RpcError::Unreachable(connection.peer.to_string()))?;
        let services = remote.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(services.descriptors())
    }
}

#[async_trait]
impl Hap for SimDevice {
    async fn get_features(&self, connection: &Connection) -> Result<Vec<u8>, RpcError> {
        let service = self.remote_hearing_access(connection)?;
        Ok(service.server_features.to_bytes())
    }

    async fn get_all_preset_records(&self, connection: &Connection) -> Result<Vec<RpcPresetRecord>, RpcError> {
        let service = self.remote_hearing_access(connection)?;
        Ok(service.sorted_presets().iter().map(RpcPresetRecord::from).collect())
    }

    async fn wait_peripheral(&self, connection: &Connection) -> Result<(), RpcError> {
        self.remote_hearing_access(connection)?;
        if !self.air.is_central(connection)? {
            return Err(RpcError::Profile("HAP client must be the central".to_string()));
        }
        self.air.attach_hap(connection)?;
        debug!("{} HAP client attached on {}", self.label, connection);
        Ok(())
    }
}

#[async_trait]
impl ServiceConfigurator for SimDevice {
    async fn add_hearing_access_service(&self, config: HearingAccessServiceConfig) -> Result<(), RpcError> {
        self.check_reachable()?;
        let mut services = self.services();
        if services.hearing_access.is_some() {
            return Err(RpcError::InvalidArgument(
                "a Hearing Access Service is already registered".to_string(),
            ));
        }
        info!(
            "{} hosts a Hearing Access Service with {} preset(s)",
            self.label,
            config.preset_count()
        );
        services.hearing_access = Some(config);
        Ok(())
    }

    async fn add_aics_service(&self, config: AicsServiceConfig) -> Result<(), RpcError> {
        self.check_reachable()?;
        config.validate()?;
        self.services().aics.push(config);
        info!("{} hosts an Audio Input Control Service", self.label);
        Ok(())
    }
}
