//! Connection and pairing sequencing between two device roles
//!
//! The sequencer drives a central and a peripheral through advertise, scan,
//! connect, MTU exchange and pairing. Both halves of a handshake are started
//! together and jointly awaited; across steps execution is strictly
//! sequential. Any failure variant, RPC error or timeout aborts the whole
//! sequence without retrying, and every advertisement or scan stream opened
//! on the way is cancelled on every exit path.

use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};

use crate::bluetooth::{
    Address, AddressType, AdvertiseRequest, AdvertiseStream, ConnectResult, Connection, OwnAddressType,
    ScanningResponse, SecurityResult,
};
use crate::config::SequencerConfig;
use crate::error::{RpcError, SequenceError};
use crate::harness::device::{DeviceRole, LinkRole, ScanFilter};
use crate::logging::StepTimer;

/// Own address type used by the central when scanning and connecting
pub const CENTRAL_OWN_ADDRESS_TYPE: OwnAddressType = AddressType::Random;

/// Both views of one established link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPair {
    /// Device under test's view of the link to the reference
    pub dut_ref: Connection,
    /// Reference's view of the link to the device under test
    pub ref_dut: Connection,
}

impl ConnectionPair {
    /// Pair two views, rejecting views that do not name the same link
    pub fn new(dut_ref: Connection, ref_dut: Connection) -> Result<Self, SequenceError> {
        if dut_ref.link.0 == 0 || dut_ref.local.is_null() || dut_ref.peer.is_null() {
            return Err(SequenceError::AsymmetricConnection(format!("null connection {}", dut_ref)));
        }
        if !dut_ref.mirrors(&ref_dut) {
            return Err(SequenceError::AsymmetricConnection(format!("{} vs {}", dut_ref, ref_dut)));
        }
        Ok(Self { dut_ref, ref_dut })
    }
}

/// Bound `future` by `timeout`
async fn bounded<T, F>(step: &'static str, timeout: Duration, future: F) -> Result<T, SequenceError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| SequenceError::Timeout { step, timeout })
}

/// Bound an RPC by `timeout` and tag its failure with the step name
async fn call<T, F>(step: &'static str, timeout: Duration, future: F) -> Result<T, SequenceError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    bounded(step, timeout, future)
        .await?
        .map_err(|source| SequenceError::Rpc { step, source })
}

fn require_success(step: &'static str, result: Result<SecurityResult, RpcError>) -> Result<(), SequenceError> {
    match result {
        Ok(SecurityResult::Success) => Ok(()),
        Ok(other) => Err(SequenceError::FailureVariant {
            step,
            variant: other.variant().to_string(),
        }),
        Err(source) => Err(SequenceError::Rpc { step, source }),
    }
}

fn check_link_roles(central: &DeviceRole, peripheral: &DeviceRole) -> Result<(), SequenceError> {
    if central.link_role() != LinkRole::Central {
        return Err(SequenceError::RoleMismatch {
            role: central.label().to_string(),
            expected: "central",
        });
    }
    if peripheral.link_role() != LinkRole::Peripheral {
        return Err(SequenceError::RoleMismatch {
            role: peripheral.label().to_string(),
            expected: "peripheral",
        });
    }
    Ok(())
}

/// Runs the connection and pairing sequence
#[derive(Debug, Clone)]
pub struct Sequencer {
    config: SequencerConfig,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    fn scope(central: &DeviceRole, peripheral: &DeviceRole) -> String {
        format!("{}->{}", central.label(), peripheral.label())
    }

    /// Start advertising on `peripheral`
    pub async fn advertise(
        &self,
        peripheral: &DeviceRole,
        request: AdvertiseRequest,
    ) -> Result<AdvertiseStream, SequenceError> {
        call("advertise", self.config.step_timeout, peripheral.advertise(request)).await
    }

    /// Advertise on `peripheral`, find it from `central` through `filter`
    /// and connect
    ///
    /// If several advertisements match, the first one observed is used.
    pub async fn connect(
        &self,
        central: &DeviceRole,
        peripheral: &DeviceRole,
        advertise: AdvertiseRequest,
        filter: ScanFilter,
    ) -> Result<ConnectionPair, SequenceError> {
        check_link_roles(central, peripheral)?;
        let mut advertisement = self.advertise(peripheral, advertise).await?;
        let result = self.connect_advertised(central, peripheral, &mut advertisement, filter).await;
        advertisement.cancel();
        result
    }

    /// Scan for an advertisement already started by the caller and connect
    ///
    /// `advertisement` is cancelled before returning, whatever the outcome.
    pub async fn connect_advertised(
        &self,
        central: &DeviceRole,
        peripheral: &DeviceRole,
        advertisement: &mut AdvertiseStream,
        filter: ScanFilter,
    ) -> Result<ConnectionPair, SequenceError> {
        let result = async {
            check_link_roles(central, peripheral)?;
            let target = self.find(central, filter).await?;
            self.join_connect(central, peripheral, advertisement, target.address, target.address_type)
                .await
        }
        .await;
        advertisement.cancel();
        result
    }

    /// Advertise on `peripheral` and connect to its known address without
    /// scanning
    pub async fn connect_direct(
        &self,
        central: &DeviceRole,
        peripheral: &DeviceRole,
        advertise: AdvertiseRequest,
    ) -> Result<ConnectionPair, SequenceError> {
        check_link_roles(central, peripheral)?;
        let address_type = advertise.own_address_type;
        let mut advertisement = self.advertise(peripheral, advertise).await?;
        let result = self
            .join_connect(central, peripheral, &mut advertisement, peripheral.address(), address_type)
            .await;
        advertisement.cancel();
        result
    }

    /// First advertisement accepted by `filter`
    async fn find(&self, central: &DeviceRole, filter: ScanFilter) -> Result<ScanningResponse, SequenceError> {
        let timer = StepTimer::start(module_path!(), central.label(), "scan");
        let mut scan = call(
            "scan",
            self.config.step_timeout,
            central.scan_with(CENTRAL_OWN_ADDRESS_TYPE, filter),
        )
        .await?;

        let found = bounded("scan", self.config.scan_timeout, scan.next_match()).await;
        scan.cancel();
        let found = found?.ok_or(SequenceError::StreamEnded("scan"))?;

        timer.finish();
        debug!("{} found {} ({:?})", central.label(), found.address, found.address_type);
        Ok(found)
    }

    /// Connect from `central` while `advertisement` yields the
    /// peripheral-side event; both halves are awaited together
    async fn join_connect(
        &self,
        central: &DeviceRole,
        peripheral: &DeviceRole,
        advertisement: &mut AdvertiseStream,
        address: Address,
        address_type: AddressType,
    ) -> Result<ConnectionPair, SequenceError> {
        let timer = StepTimer::start(module_path!(), Self::scope(central, peripheral), "connect");

        let central_side = async {
            match central.connect(address, address_type, CENTRAL_OWN_ADDRESS_TYPE).await {
                Ok(ConnectResult::Connection(connection)) => Ok(connection),
                Ok(other) => Err(SequenceError::FailureVariant {
                    step: "connect",
                    variant: other.variant().to_string(),
                }),
                Err(source) => Err(SequenceError::Rpc { step: "connect", source }),
            }
        };
        let peripheral_side = async {
            advertisement
                .next_event()
                .await
                .map(|event| event.connection)
                .ok_or(SequenceError::StreamEnded("advertise"))
        };

        // Fails fast when one side reports a failure instead of waiting for the other
        let joined = bounded("connect", self.config.connect_timeout, async {
            futures::try_join!(central_side, peripheral_side)
        })
        .await;
        let (dut_ref, ref_dut) = match joined {
            Ok(Ok(views)) => views,
            Ok(Err(e)) | Err(e) => {
                warn!("Connection {} failed: {}", Self::scope(central, peripheral), e);
                return Err(e);
            }
        };

        let pair = ConnectionPair::new(dut_ref, ref_dut)?;
        timer.finish();
        info!("{} connected to {} on {}", central.label(), peripheral.label(), pair.dut_ref.link);
        Ok(pair)
    }

    /// Exchange the MTU, then secure the link from the central while the
    /// peripheral waits for the same level
    ///
    /// Returns the negotiated MTU.
    pub async fn secure(
        &self,
        central: &DeviceRole,
        peripheral: &DeviceRole,
        pair: &ConnectionPair,
    ) -> Result<u16, SequenceError> {
        let scope = Self::scope(central, peripheral);

        let timer = StepTimer::start(module_path!(), scope.as_str(), "exchange_mtu");
        let mtu = call(
            "exchange_mtu",
            self.config.step_timeout,
            central.exchange_mtu(self.config.mtu, &pair.dut_ref),
        )
        .await?;
        timer.finish();
        debug!("{} negotiated MTU {}", scope, mtu);

        let timer = StepTimer::start(module_path!(), scope.as_str(), "secure");
        let level = self.config.security_level;
        let central_side = async { require_success("secure", central.secure(&pair.dut_ref, level).await) };
        let peripheral_side = async {
            require_success("wait_security", peripheral.wait_security(&pair.ref_dut, level).await)
        };

        bounded("secure", self.config.security_timeout, async {
            futures::try_join!(central_side, peripheral_side)
        })
        .await?
        .map_err(|e| {
            warn!("Securing {} failed: {}", scope, e);
            e
        })?;

        timer.finish();
        info!("{} secured at {:?}", scope, level);
        Ok(mtu)
    }

    /// Wait until the central's HAP client is attached to the peripheral's server
    pub async fn wait_peripheral(&self, central: &DeviceRole, pair: &ConnectionPair) -> Result<(), SequenceError> {
        let timer = StepTimer::start(module_path!(), central.label(), "wait_peripheral");
        call("wait_peripheral", self.config.step_timeout, central.wait_peripheral(&pair.dut_ref)).await?;
        timer.finish();
        Ok(())
    }

    /// [`Sequencer::connect`] followed by [`Sequencer::secure`]
    pub async fn establish(
        &self,
        central: &DeviceRole,
        peripheral: &DeviceRole,
        advertise: AdvertiseRequest,
        filter: ScanFilter,
    ) -> Result<ConnectionPair, SequenceError> {
        let pair = self.connect(central, peripheral, advertise, filter).await?;
        self.secure(central, peripheral, &pair).await?;
        Ok(pair)
    }
}
