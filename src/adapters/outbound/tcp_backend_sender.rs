//! TCP Backend Sender
//!
//! Implements BackendSender with one fresh TCP connection per attempt and
//! a fixed retry budget.

use crate::adapters::codec::{read_envelope, write_envelope};
use crate::domain::entities::Envelope;
use crate::domain::error::{AttemptError, SendError};
use crate::domain::ports::BackendSender;
use crate::domain::value_objects::BackendAddress;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;

/// Retry and timeout budget for outbound sends.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Timeout for establishing each connection
    pub connect_timeout: Duration,
    /// Timeout for handing the whole frame to the socket
    pub write_timeout: Duration,
    /// Timeout for the acknowledgement after writing
    pub read_timeout: Duration,
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Unpooled TCP sender.
pub struct TcpBackendSender {
    config: SenderConfig,
}

impl TcpBackendSender {
    pub fn new(config: SenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    async fn connect(&self, address: &BackendAddress) -> Result<TcpStream, AttemptError> {
        let addr = address.socket_addr_string();
        match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(AttemptError::Connect(e)),
            Err(_) => Err(AttemptError::ConnectTimeout(self.config.connect_timeout)),
        }
    }

    async fn write<W>(&self, stream: &mut W, envelope: &Envelope) -> Result<(), AttemptError>
    where
        W: AsyncWrite + Unpin,
    {
        tokio::time::timeout(self.config.write_timeout, write_envelope(stream, envelope))
            .await
            .map_err(|_| AttemptError::WriteTimeout(self.config.write_timeout))??;
        Ok(())
    }

    /// A single connect, write, read-ack round trip.
    async fn attempt(
        &self,
        address: &BackendAddress,
        envelope: &Envelope,
    ) -> Result<Envelope, AttemptError> {
        let mut stream = self.connect(address).await?;
        self.write(&mut stream, envelope).await?;

        let reply = tokio::time::timeout(self.config.read_timeout, read_envelope(&mut stream))
            .await
            .map_err(|_| AttemptError::ReadTimeout(self.config.read_timeout))??;

        if reply.is_ack() {
            Ok(reply)
        } else {
            Err(AttemptError::UnexpectedReply(reply.operation))
        }
    }
}

impl Default for TcpBackendSender {
    fn default() -> Self {
        Self::new(SenderConfig::default())
    }
}

#[async_trait]
impl BackendSender for TcpBackendSender {
    async fn send(
        &self,
        address: &BackendAddress,
        envelope: &Envelope,
    ) -> Result<Envelope, SendError> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(address, envelope).await {
                Ok(ack) => return Ok(ack),
                Err(e) if attempt >= attempts => {
                    return Err(SendError::NoAcknowledgement { attempts, last: e });
                }
                Err(e) => {
                    tracing::debug!(
                        "send of {} to {} failed (attempt {}/{}): {}",
                        envelope.operation,
                        address,
                        attempt,
                        attempts,
                        e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.config.backoff).await;
                }
            }
        }
    }

    async fn push(
        &self,
        address: &BackendAddress,
        envelope: &Envelope,
    ) -> Result<(), AttemptError> {
        let mut stream = self.connect(address).await?;
        self.write(&mut stream, envelope).await
    }
}
