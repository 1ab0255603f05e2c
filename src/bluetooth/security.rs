//! Security control interface

use async_trait::async_trait;

use crate::bluetooth::types::{Connection, SecurityLevel, SecurityResult};
use crate::error::RpcError;

#[async_trait]
pub trait Security: Send + Sync {
    /// Initiate pairing/encryption until `level` is reached
    async fn secure(&self, connection: &Connection, level: SecurityLevel) -> Result<SecurityResult, RpcError>;

    /// Wait until the peer has secured the link to `level`
    async fn wait_security(
        &self,
        connection: &Connection,
        level: SecurityLevel,
    ) -> Result<SecurityResult, RpcError>;
}
