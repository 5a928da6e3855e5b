//! State reporting to the hub.
//!
//! The reporter remembers what it last told the hub and turns fresh
//! [`DoorSnapshot`]s into protocol lines:
//!
//! - the first snapshot is sent as a HEARTBEAT so the hub learns the full state,
//! - later snapshots produce one EVENT per changed point on channel D0,
//! - [`heartbeat`](StateReporter::heartbeat) additionally sends a HEARTBEAT.
//!
//! The single physical door is reported on D0 and mirrored onto D1 in
//! HEARTBEAT lines.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::door::DoorSnapshot;
use doorlink_core::{Channel, ModuleId, Point, PointState};
use doorlink_network::{TransportError, UdpTransport};
use doorlink_protocol::{ChannelReport, Message};

/// Which message classes the reporter sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportMode {
    pub events: bool,
    pub heartbeats: bool,
}

impl Default for ReportMode {
    fn default() -> Self {
        Self {
            events: true,
            heartbeats: true,
        }
    }
}

/// Sends EVENT and HEARTBEAT lines for one module.
pub struct StateReporter {
    transport: Arc<UdpTransport>,
    module_id: ModuleId,
    notify_dest: SocketAddr,
    heartbeat_dest: SocketAddr,
    mode: ReportMode,
    last: Option<DoorSnapshot>,
}

impl StateReporter {
    pub fn new(
        transport: Arc<UdpTransport>,
        module_id: ModuleId,
        notify_dest: SocketAddr,
        heartbeat_dest: SocketAddr,
        mode: ReportMode,
    ) -> Self {
        Self {
            transport,
            module_id,
            notify_dest,
            heartbeat_dest,
            mode,
            last: None,
        }
    }

    /// Snapshot most recently reported, if any.
    pub fn last_reported(&self) -> Option<DoorSnapshot> {
        self.last
    }

    /// Announce the module to the hub.
    ///
    /// # Errors
    /// Returns the transport error if the datagram could not be sent.
    pub async fn hello(&self) -> Result<(), TransportError> {
        let hello = Message::hello(self.module_id.clone());
        self.transport.send_to(&hello, self.notify_dest).await
    }

    /// Report state after a door operation.
    ///
    /// # Errors
    /// Returns the first transport error; the snapshot is recorded anyway so
    /// a lost datagram is not retried as a stale change.
    pub async fn report(&mut self, snapshot: DoorSnapshot) -> Result<(), TransportError> {
        match self.last.replace(snapshot) {
            None => self.send_heartbeat(snapshot).await,
            Some(previous) => self.send_changes(previous, snapshot).await,
        }
    }

    /// Periodic report: changes since the last report, then a HEARTBEAT.
    ///
    /// # Errors
    /// Returns the first transport error.
    pub async fn heartbeat(&mut self, snapshot: DoorSnapshot) -> Result<(), TransportError> {
        if let Some(previous) = self.last.replace(snapshot) {
            self.send_changes(previous, snapshot).await?;
        }
        self.send_heartbeat(snapshot).await
    }

    async fn send_changes(
        &self,
        previous: DoorSnapshot,
        current: DoorSnapshot,
    ) -> Result<(), TransportError> {
        if !self.mode.events {
            return Ok(());
        }

        if previous.open != current.open {
            self.send_event(Point::Door, PointState::door(current.open))
                .await?;
        }
        if previous.locked != current.locked {
            self.send_event(Point::Lock, PointState::lock(current.locked))
                .await?;
        }
        Ok(())
    }

    async fn send_event(&self, point: Point, state: PointState) -> Result<(), TransportError> {
        debug!(module_id = %self.module_id, %point, %state, "Reporting change");
        let event = Message::event(self.module_id.clone(), Channel::D0, point, state);
        self.transport.send_to(&event, self.notify_dest).await
    }

    async fn send_heartbeat(&self, snapshot: DoorSnapshot) -> Result<(), TransportError> {
        if !self.mode.heartbeats {
            return Ok(());
        }

        let report = ChannelReport::new(snapshot.open, snapshot.locked);
        let heartbeat = Message::heartbeat(self.module_id.clone(), report, report);
        trace!(line = %heartbeat, "Heartbeat");
        self.transport.send_to(&heartbeat, self.heartbeat_dest).await
    }
}
