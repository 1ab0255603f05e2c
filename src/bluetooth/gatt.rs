//! GATT client interface

use async_trait::async_trait;

use crate::bluetooth::types::{Connection, GattServiceDescriptor};
use crate::error::RpcError;

/// Smallest ATT MTU a link may use
pub const ATT_DEFAULT_MTU: u16 = 23;

/// Largest ATT MTU a peer may request
pub const ATT_MAX_MTU: u16 = 517;

#[async_trait]
pub trait Gatt: Send + Sync {
    /// Negotiate the ATT MTU; returns the MTU in effect afterwards
    async fn exchange_mtu(&self, mtu: u16, connection: &Connection) -> Result<u16, RpcError>;

    /// Discover the primary services of the remote peer
    async fn discover_services(&self, connection: &Connection) -> Result<Vec<GattServiceDescriptor>, RpcError>;
}
