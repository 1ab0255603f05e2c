//! Interfaces of a peer's Bluetooth stack as seen by the harness

mod gatt;
mod hap;
mod host;
mod security;
pub mod stream;
pub mod types;
pub mod uuids;

pub use gatt::{Gatt, ATT_DEFAULT_MTU, ATT_MAX_MTU};
pub use hap::{Hap, ServiceConfigurator};
pub use host::Host;
pub use security::Security;

pub use stream::{AdvertiseStream, CancellableStream, ScanStream};
pub use types::{
    Address, AddressType, AdvertiseRequest, AdvertiseResponse, ConnectResult, Connection,
    DataTypes, GattServiceDescriptor, LinkId, OwnAddressType, RpcPresetRecord, ScanningResponse,
    SecurityLevel, SecurityResult,
};
