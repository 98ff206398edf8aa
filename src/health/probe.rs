//! Liveness probes.
//!
//! # Responsibilities
//! - Define the probe contract used by the health aggregator
//! - Provide a TCP connect probe as the trivial round-trip
//!
//! # Design Decisions
//! - Probes never run directly; the aggregator routes them through the
//!   dependency's breaker so a failing probe cannot bypass it
//! - Any `Fn() -> Future` closure is a probe, for in-process clients

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;

use crate::config::schema::ProbeConfig;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProbeError(String);

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A cheap liveness check for one dependency.
pub trait Probe: Send + Sync {
    fn probe(&self) -> BoxFuture<'static, Result<(), ProbeError>>;
}

impl<F, Fut> Probe for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProbeError>> + Send + 'static,
{
    fn probe(&self) -> BoxFuture<'static, Result<(), ProbeError>> {
        self().boxed()
    }
}

/// Succeeds when a TCP connection can be opened within the timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.address.clone(), Duration::from_millis(config.timeout_ms))
    }
}

impl Probe for TcpProbe {
    fn probe(&self) -> BoxFuture<'static, Result<(), ProbeError>> {
        let address = self.address.clone();
        let timeout = self.timeout;
        async move {
            match time::timeout(timeout, TcpStream::connect(&address)).await {
                Ok(Ok(_stream)) => Ok(()),
                Ok(Err(e)) => Err(ProbeError::new(format!("connect to {address} failed: {e}"))),
                Err(_) => Err(ProbeError::new(format!(
                    "connect to {address} timed out after {}ms",
                    timeout.as_millis()
                ))),
            }
        }
        .boxed()
    }
}
