//! Pushing the routing table to the proxy.

use crate::retry::{Backoff, RetryError, retry_until};
use async_trait::async_trait;
use dockyard_core::{ProxyRequest, ProxyResponse, RoutingTable};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProxySyncError {
    #[error("unable to reach the proxy at {addr}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out talking to the proxy at {addr}")]
    Timeout { addr: String },

    #[error("malformed proxy message")]
    Codec(#[from] serde_json::Error),

    #[error("proxy rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected proxy response: {0:?}")]
    Unexpected(ProxyResponse),

    #[error("proxy did not become ready after {attempts} attempts")]
    NotReady {
        attempts: u32,
        #[source]
        last: Box<ProxySyncError>,
    },

    #[error("cancelled while waiting for the proxy")]
    Cancelled,
}

/// The proxy's control endpoint.
#[async_trait]
pub trait ProxyClient: Send + Sync {
    async fn ping(&self) -> Result<(), ProxySyncError>;

    /// Replaces the proxy's routing state with `table`.
    async fn apply(&self, table: &RoutingTable) -> Result<(), ProxySyncError>;
}

/// JSON-over-TCP client, one request per connection.
#[derive(Debug, Clone)]
pub struct TcpProxyClient {
    addr: String,
    io_timeout: Duration,
}

impl TcpProxyClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            io_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn exchange(&self, request: &ProxyRequest) -> Result<ProxyResponse, ProxySyncError> {
        let io = |source: std::io::Error| ProxySyncError::Io {
            addr: self.addr.clone(),
            source,
        };
        let request_bytes = serde_json::to_vec(request)?;

        let round_trip = async {
            let mut stream = TcpStream::connect(&self.addr).await.map_err(io)?;
            stream.write_all(&request_bytes).await.map_err(io)?;
            stream.shutdown().await.map_err(io)?;

            let mut response_bytes = Vec::new();
            stream.read_to_end(&mut response_bytes).await.map_err(io)?;
            Ok::<_, ProxySyncError>(response_bytes)
        };

        let response_bytes = tokio::time::timeout(self.io_timeout, round_trip)
            .await
            .map_err(|_| ProxySyncError::Timeout {
                addr: self.addr.clone(),
            })??;

        Ok(serde_json::from_slice(&response_bytes)?)
    }
}

#[async_trait]
impl ProxyClient for TcpProxyClient {
    async fn ping(&self) -> Result<(), ProxySyncError> {
        match self.exchange(&ProxyRequest::Ping).await? {
            ProxyResponse::Pong | ProxyResponse::Ok => Ok(()),
            ProxyResponse::Error(message) => Err(ProxySyncError::Rejected(message)),
        }
    }

    async fn apply(&self, table: &RoutingTable) -> Result<(), ProxySyncError> {
        match self.exchange(&ProxyRequest::Apply(table.clone())).await? {
            ProxyResponse::Ok => Ok(()),
            ProxyResponse::Error(message) => Err(ProxySyncError::Rejected(message)),
            other @ ProxyResponse::Pong => Err(ProxySyncError::Unexpected(other)),
        }
    }
}

/// Waits for the proxy to answer pings, then sends `table` exactly once.
///
/// # Errors
///
/// Returns [`ProxySyncError::NotReady`] if the proxy never answers within the
/// backoff deadline, [`ProxySyncError::Cancelled`] if `cancel` fires first, or
/// the apply failure itself.
pub async fn sync_routing(
    client: &dyn ProxyClient,
    table: &RoutingTable,
    backoff: &Backoff,
    cancel: &CancellationToken,
) -> Result<(), ProxySyncError> {
    retry_until(backoff, cancel, "proxy ping", || client.ping())
        .await
        .map_err(|e| match e {
            RetryError::DeadlineExceeded { attempts, last } => ProxySyncError::NotReady {
                attempts,
                last: Box::new(last),
            },
            RetryError::Cancelled => ProxySyncError::Cancelled,
        })?;
    debug!("Proxy is ready");

    client.apply(table).await?;
    info!(sites = table.sites.len(), "Routing table applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockyard_core::config::Site;
    use tokio::net::TcpListener;

    /// Answers each connection with the next canned response.
    async fn serve(responses: Vec<ProxyResponse>) -> (String, tokio::task::JoinHandle<Vec<ProxyRequest>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf).await.unwrap();
                seen.push(serde_json::from_slice(&buf).unwrap());
                stream
                    .write_all(&serde_json::to_vec(&response).unwrap())
                    .await
                    .unwrap();
            }
            seen
        });

        (addr, handle)
    }

    fn fast() -> Backoff {
        Backoff {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
            deadline: Duration::from_millis(200),
        }
    }

    fn table() -> RoutingTable {
        RoutingTable::from_sites(&[Site {
            hostname: "a.test".to_string(),
            ..Site::default()
        }])
    }

    #[tokio::test]
    async fn test_ping_then_single_apply() {
        let (addr, server) = serve(vec![ProxyResponse::Pong, ProxyResponse::Ok]).await;
        let client = TcpProxyClient::new(addr);

        sync_routing(&client, &table(), &fast(), &CancellationToken::new())
            .await
            .unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen, vec![ProxyRequest::Ping, ProxyRequest::Apply(table())]);
    }

    #[tokio::test]
    async fn test_rejected_apply_is_reported() {
        let (addr, _server) = serve(vec![
            ProxyResponse::Pong,
            ProxyResponse::Error("bad table".to_string()),
        ])
        .await;
        let client = TcpProxyClient::new(addr);

        let err = sync_routing(&client, &table(), &fast(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ProxySyncError::Rejected(ref m) if m == "bad table"));
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_not_ready() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = TcpProxyClient::new(addr);
        let err = sync_routing(&client, &table(), &fast(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ProxySyncError::NotReady { .. }));
    }
}
