//! Value types shared by the host, security, GATT and HAP interfaces

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RpcError;

/// A 6-byte Bluetooth device address, most significant byte first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 6]);

impl Address {
    /// Create an address from its bytes
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// The all-zero address is never assigned to a peer
    pub fn is_null(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl From<[u8; 6]> for Address {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for Address {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(RpcError::InvalidArgument(format!("Invalid address format: {}", s)));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16).map_err(|e| {
                RpcError::InvalidArgument(format!("Invalid hex byte '{}': {}", part, e))
            })?;
        }

        Ok(Self(bytes))
    }
}

// Addresses travel as strings in configuration files and reports
impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e: RpcError| D::Error::custom(e.to_string()))
    }
}

/// Type of a peer address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    #[default]
    Public,
    Random,
}

/// Address type the initiator of a procedure uses for itself
pub type OwnAddressType = AddressType;

/// Advertising payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataTypes {
    /// Complete local name AD structure
    pub complete_local_name: Option<String>,
    /// Incomplete list of 16-bit service class UUIDs, stored in 128-bit form
    pub incomplete_service_class_uuids16: Vec<Uuid>,
    /// Service data keyed by service UUID
    pub service_data: BTreeMap<Uuid, Vec<u8>>,
}

impl DataTypes {
    /// Payload carrying only a local name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            complete_local_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add a 16-bit service UUID to the payload
    pub fn with_service_uuid16(mut self, uuid: Uuid) -> Self {
        self.incomplete_service_class_uuids16.push(uuid);
        self
    }

    /// Whether the payload lists the given 16-bit service UUID
    pub fn has_service_uuid16(&self, uuid: &Uuid) -> bool {
        self.incomplete_service_class_uuids16.contains(uuid)
    }
}

/// Parameters of an advertising set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseRequest {
    pub legacy: bool,
    pub connectable: bool,
    pub own_address_type: OwnAddressType,
    pub data: DataTypes,
}

impl Default for AdvertiseRequest {
    fn default() -> Self {
        Self {
            legacy: true,
            connectable: true,
            own_address_type: AddressType::Public,
            data: DataTypes::default(),
        }
    }
}

impl AdvertiseRequest {
    /// Legacy connectable advertising with the given payload
    pub fn connectable(own_address_type: OwnAddressType, data: DataTypes) -> Self {
        Self {
            legacy: true,
            connectable: true,
            own_address_type,
            data,
        }
    }
}

/// Identifier of one logical link in the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// One side's view of a link
///
/// Each peer holds its own `Connection` for the same link, with `local` and
/// `peer` swapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    pub link: LinkId,
    pub local: Address,
    pub peer: Address,
}

impl Connection {
    /// Whether `other` is the opposite side of the same link
    pub fn mirrors(&self, other: &Connection) -> bool {
        self.link == other.link && self.local == other.peer && self.peer == other.local
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.link, self.local, self.peer)
    }
}

/// Event yielded by an advertisement stream when a central connects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseResponse {
    pub connection: Connection,
}

/// One observed advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanningResponse {
    pub address: Address,
    pub address_type: AddressType,
    pub legacy: bool,
    pub connectable: bool,
    pub data: DataTypes,
    pub rssi: i8,
}

/// Outcome of a connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectResult {
    Connection(Connection),
    PeerNotFound,
    ConnectionAlreadyExists,
    PairingFailure,
    Timeout,
}

impl ConnectResult {
    /// Name of the variant, as reported in sequence failures
    pub fn variant(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::PeerNotFound => "peer_not_found",
            Self::ConnectionAlreadyExists => "connection_already_exists",
            Self::PairingFailure => "pairing_failure",
            Self::Timeout => "timeout",
        }
    }

    /// The connection carried by a success variant
    pub fn connection(self) -> Option<Connection> {
        match self {
            Self::Connection(connection) => Some(connection),
            _ => None,
        }
    }
}

/// LE security levels, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// No security
    LeLevel1,
    /// Unauthenticated pairing with encryption
    LeLevel2,
    /// Authenticated pairing with encryption
    LeLevel3,
    /// Authenticated LE Secure Connections pairing
    LeLevel4,
}

/// Outcome of `secure` or `wait_security`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityResult {
    Success,
    NotReached,
    ConnectionDied,
    PairingFailure,
    AuthenticationFailure,
    EncryptionFailure,
}

impl SecurityResult {
    /// Name of the variant, as reported in sequence failures
    pub fn variant(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotReached => "not_reached",
            Self::ConnectionDied => "connection_died",
            Self::PairingFailure => "pairing_failure",
            Self::AuthenticationFailure => "authentication_failure",
            Self::EncryptionFailure => "encryption_failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A primary service as reported by GATT discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattServiceDescriptor {
    pub handle: u16,
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

/// A preset record as it travels over the HAP interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcPresetRecord {
    pub index: u32,
    pub name: String,
    pub is_writable: bool,
    pub is_available: bool,
}
