use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{
    channel,
    error::{SendTimeoutError, TrySendError},
    Receiver, Sender,
};

use crate::{
    error::Error,
    sync::{ReceiveTimeoutError, TimeoutReceiver},
    target::TargetType,
};

use super::{command::BusCommand, device::ChildDevice, slot::TargetId, ConnectionId};

/// Maximum duration to wait for a response from a command. If this timeout
/// is reached, that typically indicates a deadlock somewhere in the code.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Possible errors for a bus client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("timed out sending command to bus")]
    Timeout,
    #[error("bus is no longer running")]
    ChannelClosed,
    #[error("bus did not respond to the request")]
    NoResponse,
    #[error("bus rejected the request: {0}")]
    ServiceError(#[from] Error),
}

impl From<ClientError> for Error {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::ChannelClosed => Error::BusNotFound,
            ClientError::Timeout | ClientError::NoResponse => Error::BusAccessFailed,
            ClientError::ServiceError(e) => e,
        }
    }
}

/// A client for the bus service
#[derive(Debug, Clone)]
pub struct BusClient {
    tx: Sender<BusCommand>,
}

impl From<Sender<BusCommand>> for BusClient {
    fn from(tx: Sender<BusCommand>) -> Self {
        BusClient::new(tx)
    }
}

impl BusClient {
    pub fn new(tx: Sender<BusCommand>) -> Self {
        Self { tx }
    }

    /// Returns true if the bus service is no longer running
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Send the given command to the bus. This method uses a timeout to
    /// detect potential deadlocks.
    async fn send(&self, cmd: BusCommand) -> Result<(), ClientError> {
        let result = self.tx.send_timeout(cmd, DEFAULT_TIMEOUT).await;
        let Err(err) = result else {
            return Ok(());
        };
        match err {
            SendTimeoutError::Timeout(ref cmd) => {
                log::error!("POSSIBLE DEADLOCK: timed out after {DEFAULT_TIMEOUT:?} sending command to bus: {cmd:?}");
                Err(ClientError::Timeout)
            }
            SendTimeoutError::Closed(_) => Err(ClientError::ChannelClosed),
        }
    }

    /// Use the given receiver to wait for a response from the bus. This
    /// method uses a timeout to detect potential deadlocks.
    async fn recv<T>(mut rx: Receiver<T>) -> Result<T, ClientError>
    where
        T: Send + Sync,
    {
        let result = rx.recv_timeout(DEFAULT_TIMEOUT).await;
        match result {
            Ok(value) => Ok(value),
            Err(ReceiveTimeoutError::Timeout) => {
                log::error!("POSSIBLE DEADLOCK: timed out after {DEFAULT_TIMEOUT:?} waiting for response from bus");
                Err(ClientError::NoResponse)
            }
            Err(ReceiveTimeoutError::Closed) => Err(ClientError::NoResponse),
        }
    }

    /// Get the version of the bus
    pub async fn get_version(&self) -> Result<String, ClientError> {
        let (tx, rx) = channel(1);
        self.send(BusCommand::GetVersion(tx)).await?;
        Self::recv(rx).await
    }

    /// Open a new connection on the bus
    pub async fn connect(&self) -> Result<ConnectionId, ClientError> {
        let (tx, rx) = channel(1);
        self.send(BusCommand::Connect(tx)).await?;
        Self::recv(rx).await
    }

    /// Plug a new child device into the lowest free slot
    pub async fn plug_in(
        &self,
        owner: ConnectionId,
        kind: TargetType,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<ChildDevice, ClientError> {
        let (tx, rx) = channel(1);
        self.send(BusCommand::PlugIn {
            owner,
            kind,
            vendor_id,
            product_id,
            sender: tx,
        })
        .await?;
        Ok(Self::recv(rx).await??)
    }

    /// Unplug the child device with the given id
    pub async fn unplug(&self, owner: ConnectionId, id: TargetId) -> Result<(), ClientError> {
        let (tx, rx) = channel(1);
        self.send(BusCommand::Unplug {
            owner,
            id,
            sender: tx,
        })
        .await?;
        Ok(Self::recv(rx).await??)
    }

    /// Unplug every child device owned by the given connection. Returns the
    /// number of removed devices.
    pub async fn unplug_owner(&self, owner: ConnectionId) -> Result<usize, ClientError> {
        let (tx, rx) = channel(1);
        self.send(BusCommand::UnplugOwner {
            owner,
            sender: Some(tx),
        })
        .await?;
        Self::recv(rx).await
    }

    /// Unplug every child device owned by the given connection without
    /// waiting.
    pub fn try_unplug_owner(&self, owner: ConnectionId) -> Result<(), ClientError> {
        match self.tx.try_send(BusCommand::UnplugOwner {
            owner,
            sender: None,
        }) {
            Ok(_) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ClientError::Timeout),
            Err(TrySendError::Closed(_)) => Err(ClientError::ChannelClosed),
        }
    }

    /// Get the child device at the given slot index
    pub async fn get_device(&self, index: u32) -> Result<Option<ChildDevice>, ClientError> {
        let (tx, rx) = channel(1);
        self.send(BusCommand::GetDevice { index, sender: tx }).await?;
        Self::recv(rx).await
    }

    /// List all plugged child devices in slot order
    pub async fn list_devices(&self) -> Result<Vec<ChildDevice>, ClientError> {
        let (tx, rx) = channel(1);
        self.send(BusCommand::ListDevices(tx)).await?;
        Self::recv(rx).await
    }

    /// Stop the bus, unplugging every child device
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.send(BusCommand::Stop).await
    }
}
