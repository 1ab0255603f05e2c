//! Hearing Access Profile client interface and service configuration

use async_trait::async_trait;

use crate::bluetooth::types::{Connection, RpcPresetRecord};
use crate::error::RpcError;
use crate::profiles::{AicsServiceConfig, HearingAccessServiceConfig};

/// HAP client operations of the device under test
#[async_trait]
pub trait Hap: Send + Sync {
    /// Raw Hearing Aid Features value read from the remote server
    async fn get_features(&self, connection: &Connection) -> Result<Vec<u8>, RpcError>;

    /// Every preset record of the remote server, in index order
    async fn get_all_preset_records(&self, connection: &Connection) -> Result<Vec<RpcPresetRecord>, RpcError>;

    /// Wait until the HAP client has attached to the remote server
    async fn wait_peripheral(&self, connection: &Connection) -> Result<(), RpcError>;
}

/// Injection of profile services into a simulated peer
#[async_trait]
pub trait ServiceConfigurator: Send + Sync {
    async fn add_hearing_access_service(&self, config: HearingAccessServiceConfig) -> Result<(), RpcError>;

    async fn add_aics_service(&self, config: AicsServiceConfig) -> Result<(), RpcError>;
}
