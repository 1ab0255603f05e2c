//! Shared medium connecting simulated devices
//!
//! The air keeps the live advertising sets (in registration order), the live
//! links and the service tables of every attached device. All state sits
//! behind one mutex; no lock is held across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};
use tokio::sync::{mpsc, watch};

use crate::bluetooth::{
    Address, AddressType, AdvertiseRequest, AdvertiseResponse, ConnectResult, Connection, LinkId,
    ScanningResponse, SecurityLevel, SecurityResult, ATT_DEFAULT_MTU,
};
use crate::error::RpcError;
use crate::sim::device::DeviceServices;

/// Signal strength reported for every simulated advertisement
const SIMULATED_RSSI: i8 = -40;

/// Security state of a link, published to waiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LinkSecurity {
    pub level: SecurityLevel,
    pub failure: Option<SecurityResult>,
}

struct Advertisement {
    id: u64,
    owner: Address,
    request: AdvertiseRequest,
    events: mpsc::UnboundedSender<AdvertiseResponse>,
}

struct Link {
    central: Address,
    peripheral: Address,
    mtu: u16,
    security: watch::Sender<LinkSecurity>,
    hap_attached: bool,
}

impl Link {
    fn involves(&self, address: Address) -> bool {
        self.central == address || self.peripheral == address
    }
}

#[derive(Default)]
struct AirState {
    next_id: u64,
    advertisements: Vec<Advertisement>,
    links: HashMap<LinkId, Link>,
    devices: HashMap<Address, Arc<Mutex<DeviceServices>>>,
    active_scans: usize,
}

/// The simulated radio medium, cheap to clone
#[derive(Clone, Default)]
pub struct SimulatedAir {
    state: Arc<Mutex<AirState>>,
}

impl SimulatedAir {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AirState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn attach(&self, address: Address, services: Arc<Mutex<DeviceServices>>) -> Result<(), RpcError> {
        let mut state = self.lock();
        if state.devices.contains_key(&address) {
            return Err(RpcError::InvalidArgument(format!("address {} already in use", address)));
        }
        state.devices.insert(address, services);
        Ok(())
    }

    pub(crate) fn detach(&self, address: Address) {
        self.drop_device_state(address);
        self.lock().devices.remove(&address);
    }

    pub(crate) fn services_of(&self, address: Address) -> Option<Arc<Mutex<DeviceServices>>> {
        self.lock().devices.get(&address).cloned()
    }

    /// Drop every advertising set and link owned by `address`
    pub(crate) fn drop_device_state(&self, address: Address) {
        let mut state = self.lock();
        let before_adv = state.advertisements.len();
        state.advertisements.retain(|adv| adv.owner != address);
        let before_links = state.links.len();
        // Removing a link drops its security sender, which wakes every waiter
        state.links.retain(|_, link| !link.involves(address));
        debug!(
            "Dropped {} advertisement(s) and {} link(s) of {}",
            before_adv - state.advertisements.len(),
            before_links - state.links.len(),
            address
        );
    }

    pub(crate) fn start_advertising(
        &self,
        owner: Address,
        request: AdvertiseRequest,
    ) -> (u64, mpsc::UnboundedReceiver<AdvertiseResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.advertisements.push(Advertisement {
            id,
            owner,
            request,
            events: tx,
        });
        debug!("{} started advertising set {}", owner, id);
        (id, rx)
    }

    pub(crate) fn stop_advertising(&self, id: u64) {
        let mut state = self.lock();
        state.advertisements.retain(|adv| adv.id != id);
    }

    pub(crate) fn scan_started(&self) {
        self.lock().active_scans += 1;
    }

    pub(crate) fn scan_stopped(&self) {
        let mut state = self.lock();
        state.active_scans = state.active_scans.saturating_sub(1);
    }

    /// Advertisements visible to `observer`, oldest first
    pub(crate) fn observe(&self, observer: Address) -> Vec<ScanningResponse> {
        self.lock()
            .advertisements
            .iter()
            .filter(|adv| adv.owner != observer)
            .map(|adv| ScanningResponse {
                address: adv.owner,
                address_type: adv.request.own_address_type,
                legacy: adv.request.legacy,
                connectable: adv.request.connectable,
                data: adv.request.data.clone(),
                rssi: SIMULATED_RSSI,
            })
            .collect()
    }

    pub(crate) fn connect(&self, central: Address, target: Address, address_type: AddressType) -> ConnectResult {
        let mut state = self.lock();

        let advertisement = state.advertisements.iter().find(|adv| {
            adv.owner == target && adv.request.connectable && adv.request.own_address_type == address_type
        });
        let (events, adv_id) = match advertisement {
            Some(adv) => (adv.events.clone(), adv.id),
            None => return ConnectResult::PeerNotFound,
        };

        if state
            .links
            .values()
            .any(|link| link.involves(central) && link.involves(target))
        {
            return ConnectResult::ConnectionAlreadyExists;
        }

        state.next_id += 1;
        let link = LinkId(state.next_id);
        let (security, _) = watch::channel(LinkSecurity {
            level: SecurityLevel::LeLevel1,
            failure: None,
        });
        state.links.insert(
            link,
            Link {
                central,
                peripheral: target,
                mtu: ATT_DEFAULT_MTU,
                security,
                hap_attached: false,
            },
        );

        let peripheral_view = Connection { link, local: target, peer: central };
        if events.send(AdvertiseResponse { connection: peripheral_view }).is_err() {
            debug!("Advertising set {} has no listener for {}", adv_id, link);
        }

        info!("{} connected to {} on {}", central, target, link);
        ConnectResult::Connection(Connection { link, local: central, peer: target })
    }

    /// Check that `connection` is a live link seen from its local side
    pub(crate) fn validate(&self, connection: &Connection) -> Result<(), RpcError> {
        let state = self.lock();
        match state.links.get(&connection.link) {
            Some(link)
                if link.involves(connection.local)
                    && link.involves(connection.peer)
                    && connection.local != connection.peer =>
            {
                Ok(())
            }
            _ => Err(RpcError::UnknownConnection(connection.to_string())),
        }
    }

    pub(crate) fn is_central(&self, connection: &Connection) -> Result<bool, RpcError> {
        let state = self.lock();
        state
            .links
            .get(&connection.link)
            .map(|link| link.central == connection.local)
            .ok_or_else(|| RpcError::UnknownConnection(connection.to_string()))
    }

    pub(crate) fn set_mtu(&self, connection: &Connection, mtu: u16) -> Result<(), RpcError> {
        let mut state = self.lock();
        let link = state
            .links
            .get_mut(&connection.link)
            .ok_or_else(|| RpcError::UnknownConnection(connection.to_string()))?;
        link.mtu = mtu;
        Ok(())
    }

    pub fn mtu(&self, link: LinkId) -> Option<u16> {
        self.lock().links.get(&link).map(|l| l.mtu)
    }

    pub(crate) fn subscribe_security(&self, connection: &Connection) -> Result<watch::Receiver<LinkSecurity>, RpcError> {
        let state = self.lock();
        state
            .links
            .get(&connection.link)
            .map(|link| link.security.subscribe())
            .ok_or_else(|| RpcError::UnknownConnection(connection.to_string()))
    }

    pub(crate) fn publish_security(&self, connection: &Connection, update: LinkSecurity) -> Result<(), RpcError> {
        let state = self.lock();
        let link = state
            .links
            .get(&connection.link)
            .ok_or_else(|| RpcError::UnknownConnection(connection.to_string()))?;
        link.security.send_replace(update);
        Ok(())
    }

    pub(crate) fn security_level(&self, connection: &Connection) -> Result<SecurityLevel, RpcError> {
        let state = self.lock();
        state
            .links
            .get(&connection.link)
            .map(|link| link.security.borrow().level)
            .ok_or_else(|| RpcError::UnknownConnection(connection.to_string()))
    }

    pub(crate) fn attach_hap(&self, connection: &Connection) -> Result<(), RpcError> {
        let mut state = self.lock();
        let link = state
            .links
            .get_mut(&connection.link)
            .ok_or_else(|| RpcError::UnknownConnection(connection.to_string()))?;
        link.hap_attached = true;
        Ok(())
    }

    pub fn is_hap_attached(&self, link: LinkId) -> bool {
        self.lock().links.get(&link).map(|l| l.hap_attached).unwrap_or(false)
    }

    /// Live advertising sets
    pub fn active_advertisements(&self) -> usize {
        self.lock().advertisements.len()
    }

    /// Scan streams not yet cancelled
    pub fn active_scans(&self) -> usize {
        self.lock().active_scans
    }

    pub fn active_links(&self) -> usize {
        self.lock().links.len()
    }

    pub fn attached_devices(&self) -> usize {
        self.lock().devices.len()
    }
}
