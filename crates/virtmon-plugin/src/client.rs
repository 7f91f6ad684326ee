// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client adaptor: a host-side [`Driver`] backed by a plugin connection.
//!
//! Calls are serialized over the single connection. Any transport or schema
//! failure leaves the stream in an unknown position, so the connection is
//! dropped and every later call behaves as if the handle had been closed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use virtmon_core::{CollectRequest, Domain, DomainHypervisor, DomainMap, Driver, VirtmonError};

use crate::options::BridgeOptions;
use crate::transport::Connection;
use crate::wire::{DetectResponse, Empty, NameResponse, Request, Response};

type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Host-side stand-in for a driver living in a plugin process.
///
/// `collect` rebuilds the map from the plugin's domain stream. Categories
/// the request did not ask for are dropped even if the plugin sent them, and
/// when the stream carries the same domain id twice the later domain wins.
pub struct DriverClient {
    conn: SharedConnection,
    probe_timeout: Duration,
    close_timeout: Duration,
}

impl std::fmt::Debug for DriverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverClient")
            .field("probe_timeout", &self.probe_timeout)
            .field("close_timeout", &self.close_timeout)
            .finish_non_exhaustive()
    }
}

impl DriverClient {
    /// Wrap a connection on which the handshake has already succeeded.
    pub fn new(conn: Connection, options: &BridgeOptions) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            probe_timeout: options.probe_timeout,
            close_timeout: options.close_timeout,
        }
    }

    /// Whether the connection is still usable.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Send one request and read its single reply within `limit`.
    ///
    /// On failure the connection is discarded.
    async fn unary(&self, request: Request, limit: Duration) -> Result<Response, VirtmonError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(VirtmonError::Closed)?;
        let result = with_timeout(limit, exchange(conn, &request)).await;
        if result.is_err() {
            *guard = None;
        }
        result
    }

    async fn collect_stream(
        conn: &mut Connection,
        request: CollectRequest,
    ) -> Result<DomainMap, VirtmonError> {
        conn.send(&Request::Collect(request.into())).await?;

        let mut domains = DomainMap::new();
        loop {
            match conn.recv::<Response>().await? {
                Some(Response::Domain(domain)) => {
                    let mut domain = Domain::from(domain);
                    domain.retain_requested(&request);
                    if let Some(previous) = domains.insert(domain.id.clone(), domain) {
                        debug!(domain = %previous.id, "duplicate domain in stream, keeping the later one");
                    }
                }
                Some(Response::EndOfStream) => return Ok(domains),
                Some(Response::Error(status)) => return Err(status.into_error()),
                Some(other) => {
                    return Err(VirtmonError::Schema(format!(
                        "unexpected `{}` frame in collect stream",
                        other.kind()
                    )));
                }
                None => {
                    return Err(VirtmonError::transport(
                        "collect stream ended before its end marker",
                        std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
                    ));
                }
            }
        }
    }
}

#[async_trait]
impl Driver for DriverClient {
    async fn detect(&self) -> bool {
        match self.unary(Request::Detect(Empty {}), self.probe_timeout).await {
            Ok(Response::Detect(DetectResponse { is_hypervisor })) => is_hypervisor,
            Ok(other) => {
                warn!(frame = other.kind(), "unexpected reply to detect, reporting not detected");
                false
            }
            Err(VirtmonError::Closed) => false,
            Err(err) => {
                warn!(error = %err, "detect failed, reporting not detected");
                false
            }
        }
    }

    async fn name(&self) -> DomainHypervisor {
        match self.unary(Request::Name(Empty {}), self.probe_timeout).await {
            Ok(Response::Name(NameResponse { name })) => DomainHypervisor::new(name),
            Ok(other) => {
                warn!(frame = other.kind(), "unexpected reply to name, reporting unknown");
                DomainHypervisor::unknown()
            }
            Err(VirtmonError::Closed) => DomainHypervisor::unknown(),
            Err(err) => {
                warn!(error = %err, "name failed, reporting unknown");
                DomainHypervisor::unknown()
            }
        }
    }

    async fn collect(&self, request: CollectRequest) -> Result<DomainMap, VirtmonError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(VirtmonError::Closed)?;
        let result = Self::collect_stream(conn, request).await;
        match &result {
            Ok(domains) => debug!(domains = domains.len(), "collection received"),
            // The plugin reported a failure in place of the stream; the
            // connection is still positioned at a frame boundary.
            Err(VirtmonError::Driver { .. } | VirtmonError::Remote { .. }) => {}
            Err(err) => {
                warn!(error = %err, "collect stream broken, dropping plugin connection");
                *guard = None;
            }
        }
        result
    }

    async fn close(&self) {
        let Some(mut conn) = self.conn.lock().await.take() else {
            debug!("driver client already closed");
            return;
        };

        let limit = self.close_timeout;
        tokio::spawn(async move {
            match with_timeout(limit, exchange(&mut conn, &Request::Close(Empty {}))).await {
                Ok(Response::Close(_)) => debug!("plugin acknowledged close"),
                Ok(other) => debug!(frame = other.kind(), "unexpected reply to close"),
                Err(err) => debug!(error = %err, "remote close did not complete"),
            }
            if let Err(err) = conn.close().await {
                debug!(error = %err, "could not close plugin connection");
            }
        });
    }
}

async fn exchange(conn: &mut Connection, request: &Request) -> Result<Response, VirtmonError> {
    conn.send(request).await?;
    match conn.recv::<Response>().await? {
        Some(Response::Error(status)) => Err(status.into_error()),
        Some(response) => Ok(response),
        None => Err(VirtmonError::transport(
            format!("plugin closed the connection during `{}`", request.kind()),
            std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
        )),
    }
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, VirtmonError>>,
) -> Result<T, VirtmonError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| VirtmonError::Timeout { duration: limit })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire;
    use proptest::prelude::*;
    use virtmon_core::DomainId;
    use tracing_test::traced_test;

    fn options() -> BridgeOptions {
        BridgeOptions {
            probe_timeout: Duration::from_millis(100),
            close_timeout: Duration::from_millis(100),
            ..BridgeOptions::default()
        }
    }

    /// A client wired to a raw plugin-side connection the test drives by hand.
    fn client_with_peer() -> (DriverClient, Connection) {
        let (a, b) = tokio::io::duplex(16 * 1024);
        let client = DriverClient::new(Connection::new(a, 16 * 1024), &options());
        (client, Connection::new(b, 16 * 1024))
    }

    fn domain(id: &str, name: &str) -> Response {
        Response::Domain(wire::Domain {
            id: id.to_string(),
            name: name.to_string(),
            cpu_stats: None,
            disk_stats: None,
            network_stats: None,
        })
    }

    #[tokio::test]
    async fn collect_populates_the_map_from_the_stream() {
        let (client, mut peer) = client_with_peer();
        let plugin = tokio::spawn(async move {
            let request: Option<Request> = peer.recv().await.unwrap();
            assert!(matches!(request, Some(Request::Collect(_))));
            peer.send(&domain("1", "alpha")).await.unwrap();
            peer.send(&domain("2", "beta")).await.unwrap();
            peer.send(&Response::EndOfStream).await.unwrap();
            peer
        });

        let domains = client.collect(CollectRequest::all()).await.unwrap();
        assert_eq!(domains.len(), 2);
        assert_eq!(domains[&DomainId::from("1")].name, "alpha");
        assert_eq!(domains[&DomainId::from("2")].name, "beta");
        plugin.await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_ids_keep_the_later_domain() {
        let (client, mut peer) = client_with_peer();
        let plugin = tokio::spawn(async move {
            let _: Option<Request> = peer.recv().await.unwrap();
            peer.send(&domain("7", "first")).await.unwrap();
            peer.send(&domain("7", "second")).await.unwrap();
            peer.send(&Response::EndOfStream).await.unwrap();
            peer
        });

        let domains = client.collect(CollectRequest::all()).await.unwrap();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[&DomainId::from("7")].name, "second");
        plugin.await.unwrap();
    }

    #[tokio::test]
    async fn categories_sent_without_being_requested_are_dropped() {
        let (client, mut peer) = client_with_peer();
        let plugin = tokio::spawn(async move {
            let _: Option<Request> = peer.recv().await.unwrap();
            peer.send(&Response::Domain(wire::Domain {
                id: "3".into(),
                name: "cache-01".into(),
                cpu_stats: Some(virtmon_core::CpuStats::default()),
                disk_stats: Some(vec![virtmon_core::DiskStats::default()]),
                network_stats: Some(Vec::new()),
            }))
            .await
            .unwrap();
            peer.send(&Response::EndOfStream).await.unwrap();
            peer
        });

        let domains = client
            .collect(CollectRequest::new(true, false, false))
            .await
            .unwrap();
        let cache = &domains[&DomainId::from("3")];
        assert!(cache.cpu.is_some());
        assert!(cache.disks.is_none());
        assert!(cache.interfaces.is_none());
        plugin.await.unwrap();
    }

    #[tokio::test]
    async fn interrupted_stream_returns_an_error_and_no_map() {
        let (client, mut peer) = client_with_peer();
        let plugin = tokio::spawn(async move {
            let _: Option<Request> = peer.recv().await.unwrap();
            peer.send(&domain("1", "alpha")).await.unwrap();
            // Plugin dies mid-stream.
            drop(peer);
        });

        let err = client.collect(CollectRequest::all()).await.unwrap_err();
        assert!(matches!(err, VirtmonError::Transport { .. }), "got {err:?}");
        plugin.await.unwrap();

        assert!(!client.is_connected().await);
        assert!(matches!(
            client.collect(CollectRequest::all()).await,
            Err(VirtmonError::Closed)
        ));
    }

    #[tokio::test]
    async fn remote_driver_failure_keeps_the_connection() {
        let (client, mut peer) = client_with_peer();
        let plugin = tokio::spawn(async move {
            let _: Option<Request> = peer.recv().await.unwrap();
            peer.send(&Response::Error(wire::Status::new(
                virtmon_core::StatusCode::Driver,
                "libvirt unreachable",
            )))
            .await
            .unwrap();
            peer
        });

        let err = client.collect(CollectRequest::all()).await.unwrap_err();
        assert!(matches!(err, VirtmonError::Driver { .. }));
        assert_eq!(err.to_string(), "driver error: libvirt unreachable");
        assert!(client.is_connected().await);
        plugin.await.unwrap();
    }

    #[tokio::test]
    async fn unexpected_frame_in_stream_is_a_schema_error() {
        let (client, mut peer) = client_with_peer();
        let plugin = tokio::spawn(async move {
            let _: Option<Request> = peer.recv().await.unwrap();
            peer.send(&Response::Detect(DetectResponse {
                is_hypervisor: true,
            }))
            .await
            .unwrap();
            peer
        });

        let err = client.collect(CollectRequest::all()).await.unwrap_err();
        assert!(matches!(err, VirtmonError::Schema(_)));
        assert!(!client.is_connected().await);
        plugin.await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn silent_plugin_degrades_detect_and_name() {
        let (client, peer) = client_with_peer();

        // Plugin is alive but never answers.
        assert!(!client.detect().await);
        assert!(logs_contain("detect failed, reporting not detected"));

        // The timed-out connection was dropped; name degrades without waiting.
        assert!(client.name().await.is_empty());
        drop(peer);
    }

    #[tokio::test]
    async fn detect_and_name_answers_are_forwarded() {
        let (client, mut peer) = client_with_peer();
        let plugin = tokio::spawn(async move {
            let _: Option<Request> = peer.recv().await.unwrap();
            peer.send(&Response::Detect(DetectResponse {
                is_hypervisor: true,
            }))
            .await
            .unwrap();
            let _: Option<Request> = peer.recv().await.unwrap();
            peer.send(&Response::Name(NameResponse { name: "kvm".into() }))
                .await
                .unwrap();
            peer
        });

        assert!(client.detect().await);
        assert_eq!(client.name().await, DomainHypervisor::new("kvm"));
        plugin.await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent_and_reaches_the_plugin_once() {
        let (client, mut peer) = client_with_peer();

        client.close().await;
        client.close().await;

        let request: Option<Request> = peer.recv().await.unwrap();
        assert_eq!(request, Some(Request::Close(Empty {})));
        peer.send(&Response::Close(Empty {})).await.unwrap();

        // The client hangs up after the acknowledgement; no second close.
        let next: Option<Request> = peer.recv().await.unwrap();
        assert!(next.is_none());

        assert!(!client.detect().await);
        assert!(client.name().await.is_empty());
        assert!(matches!(
            client.collect(CollectRequest::all()).await,
            Err(VirtmonError::Closed)
        ));
    }

    proptest! {
        #[test]
        fn collect_flags_reach_the_plugin_verbatim(cpu: bool, disk: bool, network: bool) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let seen = runtime.block_on(async move {
                let (client, mut peer) = client_with_peer();
                let plugin = tokio::spawn(async move {
                    let request: Option<Request> = peer.recv().await.unwrap();
                    peer.send(&Response::EndOfStream).await.unwrap();
                    request
                });
                let domains = client
                    .collect(CollectRequest::new(cpu, disk, network))
                    .await
                    .unwrap();
                assert!(domains.is_empty());
                plugin.await.unwrap()
            });
            prop_assert_eq!(
                seen,
                Some(Request::Collect(wire::CollectRequest { cpu, disk, network }))
            );
        }
    }
}
