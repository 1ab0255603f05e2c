//! Host control interface

use async_trait::async_trait;

use crate::bluetooth::stream::{AdvertiseStream, ScanStream};
use crate::bluetooth::types::{Address, AddressType, AdvertiseRequest, ConnectResult, OwnAddressType};
use crate::error::RpcError;

/// Host control interface of a peer
#[async_trait]
pub trait Host: Send + Sync {
    /// Bring the peer back to a clean state
    async fn reset(&self) -> Result<(), RpcError>;

    /// Start an advertising set; the stream yields one event per incoming connection
    async fn advertise(&self, request: AdvertiseRequest) -> Result<AdvertiseStream, RpcError>;

    /// Start scanning; the stream yields advertisements until cancelled
    async fn scan(&self, own_address_type: OwnAddressType) -> Result<ScanStream, RpcError>;

    /// Initiate an LE connection
    async fn connect(
        &self,
        address: Address,
        address_type: AddressType,
        own_address_type: OwnAddressType,
    ) -> Result<ConnectResult, RpcError>;
}
