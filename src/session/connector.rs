// ABOUTME: Connection factories that dial the SMSC and complete the bind handshake
// ABOUTME: The Connector trait lets sessions rebind over TCP or any other async stream source

use crate::connection::Connection;
use crate::datatypes::{AddressRange, BindRequest, BindingType, Password, SystemId, SystemType};
use crate::error::{SmppError, SmppResult};
use crate::sequence::SequenceNumber;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Credentials and address of the SMSC
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Auth {
    /// SMSC address, e.g. "smsc.example.com:2775"
    pub smsc: String,
    pub system_id: SystemId,
    pub password: Password,
    pub system_type: SystemType,
}

impl Auth {
    pub fn new(smsc: impl Into<String>, system_id: SystemId, password: Password) -> Self {
        Self {
            smsc: smsc.into(),
            system_id,
            password,
            system_type: SystemType::default(),
        }
    }

    pub fn with_system_type(mut self, system_type: SystemType) -> Self {
        self.system_type = system_type;
        self
    }

    /// Bind request for these credentials
    pub fn bind_request(&self, binding_type: BindingType, sequence_number: u32) -> BindRequest {
        BindRequest::new(
            binding_type,
            sequence_number,
            self.system_id,
            self.password,
        )
        .with_system_type(self.system_type)
    }
}

/// Produces bound connections. A session calls `connect` once when it is
/// opened and again for every rebind.
#[async_trait]
pub trait Connector: Send + Sync {
    fn binding_type(&self) -> BindingType;

    async fn connect(&self) -> SmppResult<Connection>;
}

/// Dials the SMSC over TCP and binds with the configured credentials
#[derive(Clone, Debug)]
pub struct TcpConnector {
    auth: Auth,
    binding_type: BindingType,
    address_range: AddressRange,
    dial_timeout: Duration,
    bind_timeout: Duration,
    sequence: Arc<SequenceNumber>,
}

impl TcpConnector {
    pub fn new(auth: Auth, binding_type: BindingType) -> Self {
        Self {
            auth,
            binding_type,
            address_range: AddressRange::default(),
            dial_timeout: Duration::from_secs(10),
            bind_timeout: Duration::from_secs(10),
            sequence: SequenceNumber::shared(),
        }
    }

    pub fn transmitter(auth: Auth) -> Self {
        Self::new(auth, BindingType::Transmitter)
    }

    pub fn receiver(auth: Auth) -> Self {
        Self::new(auth, BindingType::Receiver)
    }

    pub fn transceiver(auth: Auth) -> Self {
        Self::new(auth, BindingType::Transceiver)
    }

    pub fn with_address_range(mut self, address_range: AddressRange) -> Self {
        self.address_range = address_range;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Deadline for each read and write of the bind handshake
    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout = timeout;
        self
    }

    pub fn with_sequence(mut self, sequence: Arc<SequenceNumber>) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }
}

#[async_trait]
impl Connector for TcpConnector {
    fn binding_type(&self) -> BindingType {
        self.binding_type
    }

    async fn connect(&self) -> SmppResult<Connection> {
        debug!(smsc = %self.auth.smsc, binding_type = %self.binding_type, "dialing SMSC");

        let stream = tokio::time::timeout(self.dial_timeout, TcpStream::connect(&self.auth.smsc))
            .await
            .map_err(|_| SmppError::Timeout(self.dial_timeout))??;
        stream.set_nodelay(true)?;

        let request = self
            .auth
            .bind_request(self.binding_type, self.sequence.next())
            .with_address_range(self.address_range);

        bind(Connection::new(stream), request, self.bind_timeout).await
    }
}

/// Run the bind handshake on an already established connection.
///
/// On failure the connection is shut down before the error is returned.
pub async fn bind(
    mut connection: Connection,
    request: BindRequest,
    timeout: Duration,
) -> SmppResult<Connection> {
    match connection.bind(request, timeout).await {
        Ok(_) => Ok(connection),
        Err(e) => {
            let _ = connection.shutdown().await;
            Err(e)
        }
    }
}
