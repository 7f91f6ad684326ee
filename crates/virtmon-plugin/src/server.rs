// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server adaptor: runs inside the plugin process next to a concrete driver.
//!
//! Each wire call is turned into the matching [`Driver`] call and the result
//! is translated back into frames. `Collect` is all-or-nothing for the host:
//! the driver result is fully gathered and encoded before the first domain
//! frame leaves, so a failure is always reported in place of the stream.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, info, warn};
use virtmon_core::{Driver, DomainHypervisor, StatusCode, VirtmonError};

use crate::options::BridgeOptions;
use crate::transport::Connection;
use crate::wire::{self, DetectResponse, Empty, NameResponse, Request, Response, Status};

/// Serves capability calls for one driver over one connection.
///
/// Generic over any [`Driver`], including `Arc<dyn Driver>`.
pub struct DriverServer<D> {
    driver: D,
    probe_timeout: Duration,
    max_frame_bytes: usize,
}

/// How a served connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Closed,
    Disconnected,
}

impl<D: Driver> DriverServer<D> {
    pub fn new(driver: D, options: &BridgeOptions) -> Self {
        Self {
            driver,
            probe_timeout: options.probe_timeout,
            max_frame_bytes: options.max_frame_bytes,
        }
    }

    /// Serve calls until the host sends `Close` or disconnects.
    ///
    /// The driver is closed on every exit path, including a host that went
    /// away without sending `Close`. Returns an error only when the
    /// connection itself fails.
    pub async fn run(&self, mut conn: Connection) -> Result<(), VirtmonError> {
        info!("serving driver capability set");
        let result = self.serve(&mut conn).await;
        if !matches!(result, Ok(Exit::Closed)) {
            debug!("releasing driver after the host left");
            self.driver.close().await;
        }
        result.map(|_| ())
    }

    async fn serve(&self, conn: &mut Connection) -> Result<Exit, VirtmonError> {
        loop {
            let request = match conn.recv::<Request>().await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    info!("host disconnected");
                    return Ok(Exit::Disconnected);
                }
                Err(VirtmonError::Schema(message)) => {
                    error!(%message, "undecodable request, host and plugin schemas disagree");
                    conn.send(&Response::Error(Status::new(StatusCode::Schema, message)))
                        .await?;
                    continue;
                }
                Err(err) => return Err(err),
            };

            debug!(call = request.kind(), "capability call");
            match request {
                Request::Collect(collect) => self.stream_collect(conn, collect).await?,
                Request::Name(_) => {
                    let name = self.name().await;
                    conn.send(&Response::Name(NameResponse { name: name.0 }))
                        .await?;
                }
                Request::Detect(_) => {
                    let is_hypervisor = self.detect().await;
                    conn.send(&Response::Detect(DetectResponse { is_hypervisor }))
                        .await?;
                }
                Request::Close(_) => {
                    self.driver.close().await;
                    if let Err(err) = conn.send(&Response::Close(Empty {})).await {
                        debug!(error = %err, "host left before close was acknowledged");
                    }
                    info!("driver closed by host");
                    return Ok(Exit::Closed);
                }
                Request::Hello(_) => {
                    warn!("hello received after the handshake");
                    conn.send(&Response::Error(Status::new(
                        StatusCode::InvalidRequest,
                        "handshake already completed",
                    )))
                    .await?;
                }
            }
        }
    }

    /// Probe the driver, treating timeouts as "not present".
    async fn detect(&self) -> bool {
        match tokio::time::timeout(self.probe_timeout, self.driver.detect()).await {
            Ok(is_hypervisor) => is_hypervisor,
            Err(_) => {
                warn!(
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "driver detect timed out"
                );
                false
            }
        }
    }

    async fn name(&self) -> DomainHypervisor {
        match tokio::time::timeout(self.probe_timeout, self.driver.name()).await {
            Ok(name) => name,
            Err(_) => {
                warn!(
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "driver name timed out"
                );
                DomainHypervisor::unknown()
            }
        }
    }

    /// Run the driver's collection and encode the whole reply.
    ///
    /// Produces either every domain frame followed by the end marker, or a
    /// single error status. A domain that cannot be encoded, or whose frame
    /// exceeds the connection's frame limit, fails the whole call before
    /// anything is sent. Each call builds its own buffer.
    pub async fn collect_frames(&self, request: wire::CollectRequest) -> Result<Vec<Bytes>, Status> {
        let request = virtmon_core::CollectRequest::from(request);
        let domains = self.driver.collect(request).await.map_err(|err| {
            warn!(error = %err, "driver collection failed");
            Status::from(&err)
        })?;

        let mut frames = Vec::with_capacity(domains.len() + 1);
        for domain in domains.into_values() {
            let id = domain.id.clone();
            let message = Response::Domain(wire::Domain::from_collected(domain, &request));
            let frame = Connection::encode(&message).map_err(|err| {
                error!(domain = %id, error = %err, "domain does not fit the wire schema");
                Status::from(&err)
            })?;
            if frame.len() > self.max_frame_bytes {
                error!(
                    domain = %id,
                    frame_bytes = frame.len(),
                    max_frame_bytes = self.max_frame_bytes,
                    "domain frame exceeds the frame limit"
                );
                return Err(Status::new(
                    StatusCode::Schema,
                    format!(
                        "domain `{id}` encodes to {} bytes, over the {} byte frame limit",
                        frame.len(),
                        self.max_frame_bytes
                    ),
                ));
            }
            frames.push(frame);
        }
        frames.push(Connection::encode(&Response::EndOfStream).map_err(|err| Status::from(&err))?);
        Ok(frames)
    }

    async fn stream_collect(
        &self,
        conn: &mut Connection,
        request: wire::CollectRequest,
    ) -> Result<(), VirtmonError> {
        match self.collect_frames(request).await {
            Ok(frames) => {
                debug!(domains = frames.len() - 1, "streaming collection");
                for frame in frames {
                    conn.send_frame(frame).await?;
                }
                Ok(())
            }
            Err(status) => conn.send(&Response::Error(status)).await,
        }
    }
}
