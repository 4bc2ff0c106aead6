//! Per-nest packet exchange between the simulation and connection workers
//!
//! This module owns the only data shared between the tick loop and the
//! tasks that talk to sockets:
//! - One latest-value slot per direction per connection, so a slow reader
//!   only ever sees the newest packet
//! - Connection ids, so a late disconnect from a replaced connection can be
//!   told apart from the current one
//! - A shared tick counter, so a worker knows which outbound packet answers
//!   the inbound packet it just pushed
//!
//! The simulation side never waits: every call here on a [`ClientLink`] or
//! the [`ClientManager`] returns immediately.

use crate::error::ProtocolError;
use log::{debug, info};
use shared::{NestName, PacketToClient, PacketToServer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// An inbound packet and the moment the worker finished reading it
#[derive(Debug, Clone)]
pub struct Inbound {
    pub packet: PacketToServer,
    pub received_at: Instant,
}

/// Simulation half of one connection's exchange
#[derive(Debug)]
pub struct ClientLink {
    /// Unique per accepted socket, never reused
    pub connection_id: u64,
    inbound_rx: watch::Receiver<Option<Inbound>>,
    outbound_tx: watch::Sender<Option<Arc<PacketToClient>>>,
}

/// Worker half of one connection's exchange
#[derive(Debug)]
pub struct WorkerEndpoint {
    pub connection_id: u64,
    inbound_tx: watch::Sender<Option<Inbound>>,
    outbound_rx: watch::Receiver<Option<Arc<PacketToClient>>>,
    tick: Arc<AtomicU64>,
}

/// Creates both halves of a new connection's exchange
///
/// `tick` is the counter the simulation bumps at the start of every tick.
/// The worker reads it to pair each inbound packet with the first outbound
/// packet that can reflect it.
pub fn exchange(connection_id: u64, tick: Arc<AtomicU64>) -> (ClientLink, WorkerEndpoint) {
    let (inbound_tx, inbound_rx) = watch::channel(None);
    let (outbound_tx, outbound_rx) = watch::channel(None);
    (
        ClientLink {
            connection_id,
            inbound_rx,
            outbound_tx,
        },
        WorkerEndpoint {
            connection_id,
            inbound_tx,
            outbound_rx,
            tick,
        },
    )
}

impl ClientLink {
    /// Takes the newest inbound packet if one arrived since the last pop
    ///
    /// Older packets that were overwritten before the simulation got to them
    /// are gone. Returns None when nothing new arrived or the worker is gone.
    pub fn pop_inbound(&mut self) -> Option<Inbound> {
        match self.inbound_rx.has_changed() {
            Ok(true) => self.inbound_rx.borrow_and_update().clone(),
            _ => None,
        }
    }

    /// Replaces the outbound slot with `packet`
    ///
    /// Returns false if the worker has already dropped its endpoint.
    pub fn push_outbound(&self, packet: PacketToClient) -> bool {
        self.outbound_tx.send(Some(Arc::new(packet))).is_ok()
    }

    /// True once the worker on the other side has exited
    pub fn is_closed(&self) -> bool {
        self.outbound_tx.is_closed()
    }
}

impl WorkerEndpoint {
    /// Publishes a packet read from the socket
    ///
    /// Returns the simulation tick current at the time of the push. The
    /// first outbound packet that can reflect this input carries a newer
    /// tick, see [`WorkerEndpoint::next_outbound`].
    pub fn push_inbound(&self, packet: PacketToServer) -> Result<u64, ProtocolError> {
        let tick = self.tick.load(Ordering::SeqCst);
        self.inbound_tx
            .send(Some(Inbound {
                packet,
                received_at: Instant::now(),
            }))
            .map_err(|_| ProtocolError::SimulationGone)?;
        Ok(tick)
    }

    /// Waits until the outbound slot holds a packet for a tick after
    /// `after_tick`
    ///
    /// Fails once the simulation drops its half, which happens when the nest
    /// is reconnected elsewhere, disconnected, or the server shuts down.
    pub async fn next_outbound(
        &mut self,
        after_tick: u64,
    ) -> Result<Arc<PacketToClient>, ProtocolError> {
        loop {
            {
                let current = self.outbound_rx.borrow_and_update();
                if let Some(packet) = current.as_ref() {
                    if packet.tick > after_tick {
                        return Ok(Arc::clone(packet));
                    }
                }
            }
            self.outbound_rx
                .changed()
                .await
                .map_err(|_| ProtocolError::SimulationGone)?;
        }
    }

    /// Tick the simulation is currently working on
    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }
}

/// Tracks the live link of every connected nest
///
/// The manager belongs to the simulation task. It also owns the tick
/// counter workers use to pace themselves; the network layer gets a handle
/// on it through [`ClientManager::tick_counter`].
#[derive(Debug)]
pub struct ClientManager {
    /// Current link of every nest with a live connection
    links: HashMap<NestName, ClientLink>,
    /// Shared with every worker
    tick: Arc<AtomicU64>,
}

impl ClientManager {
    /// Creates a manager with no links and the tick counter at zero
    pub fn new() -> Self {
        Self {
            links: HashMap::new(),
            tick: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared handle on the tick counter, for building exchanges outside
    /// the simulation task
    pub fn tick_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.tick)
    }

    /// Announces the tick the simulation is starting
    pub fn publish_tick(&self, tick: u64) {
        self.tick.store(tick, Ordering::SeqCst);
    }

    /// Makes `link` the nest's current connection
    ///
    /// A previous link for the same nest is dropped, which ends its worker
    /// the next time that worker waits for an outbound packet.
    pub fn attach(&mut self, nest: NestName, link: ClientLink) {
        info!(
            "Nest {} now served by connection {}",
            nest, link.connection_id
        );
        if let Some(old) = self.links.insert(nest, link) {
            debug!(
                "Connection {} replaced on nest {}",
                old.connection_id, nest
            );
        }
    }

    /// Drops the nest's link, but only if it still belongs to
    /// `connection_id`
    ///
    /// Returns true if a link was removed. A stale disconnect from a
    /// connection that has since been replaced returns false.
    pub fn detach(&mut self, nest: NestName, connection_id: u64) -> bool {
        match self.links.get(&nest) {
            Some(link) if link.connection_id == connection_id => {
                self.links.remove(&nest);
                true
            }
            _ => false,
        }
    }

    /// Connection id currently serving `nest`
    pub fn connection_id(&self, nest: NestName) -> Option<u64> {
        self.links.get(&nest).map(|link| link.connection_id)
    }

    /// Newest unread inbound packet for `nest`
    pub fn pop_inbound(&mut self, nest: NestName) -> Option<Inbound> {
        self.links.get_mut(&nest).and_then(ClientLink::pop_inbound)
    }

    /// Publishes `packet` to the nest's worker
    ///
    /// Returns false if the nest has no link or its worker is gone.
    pub fn push_outbound(&self, nest: NestName, packet: PacketToClient) -> bool {
        self.links
            .get(&nest)
            .map_or(false, |link| link.push_outbound(packet))
    }

    /// Links whose worker exited without reporting it
    pub fn closed_links(&self) -> Vec<(NestName, u64)> {
        self.links
            .iter()
            .filter(|(_, link)| link.is_closed())
            .map(|(nest, link)| (*nest, link.connection_id))
            .collect()
    }

    /// Returns the number of nests with a live link
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if no nest has a live link
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Tests for the exchange halves and link bookkeeping
///
/// These cover latest-value semantics, tick pacing of the worker side,
/// and the connection-id guard on detach.
#[cfg(test)]
mod tests {
    use super::*;
    use shared::TeamName;
    use std::time::Duration;

    fn packet(tick: u64) -> PacketToClient {
        PacketToClient::new(NestName::Gulfloss, tick, tick as f64 * 0.04)
    }

    fn open(manager: &ClientManager, connection_id: u64) -> (ClientLink, WorkerEndpoint) {
        exchange(connection_id, manager.tick_counter())
    }

    #[test]
    fn test_pop_inbound_sees_only_latest() {
        let manager = ClientManager::new();
        let (mut link, worker) = open(&manager, 1);

        assert!(link.pop_inbound().is_none());

        worker
            .push_inbound(PacketToServer::reconnect("Army"))
            .unwrap();
        worker
            .push_inbound(PacketToServer::new(TeamName::Army, vec![]))
            .unwrap();

        let inbound = link.pop_inbound().unwrap();
        assert_eq!(inbound.packet.ants, Some(vec![]));
        assert!(link.pop_inbound().is_none());
    }

    #[test]
    fn test_push_inbound_reports_current_tick() {
        let manager = ClientManager::new();
        let (_link, worker) = open(&manager, 2);

        manager.publish_tick(41);
        assert_eq!(
            worker
                .push_inbound(PacketToServer::reconnect("Army"))
                .unwrap(),
            41
        );
        assert_eq!(worker.current_tick(), 41);
    }

    #[test]
    fn test_push_inbound_fails_without_simulation() {
        let manager = ClientManager::new();
        let (link, worker) = open(&manager, 3);
        drop(link);

        let result = worker.push_inbound(PacketToServer::reconnect("Army"));
        assert!(matches!(result, Err(ProtocolError::SimulationGone)));
    }

    #[tokio::test]
    async fn test_next_outbound_skips_stale_ticks() {
        let manager = ClientManager::new();
        let (link, mut worker) = open(&manager, 4);

        assert!(link.push_outbound(packet(3)));
        let waiter = tokio::spawn(async move { worker.next_outbound(3).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(link.push_outbound(packet(4)));

        let received = waiter.await.unwrap().unwrap();
        assert_eq!(received.tick, 4);
    }

    #[tokio::test]
    async fn test_next_outbound_returns_ready_packet() {
        let manager = ClientManager::new();
        let (link, mut worker) = open(&manager, 5);

        assert!(link.push_outbound(packet(7)));
        let received = worker.next_outbound(5).await.unwrap();
        assert_eq!(received.tick, 7);
    }

    #[tokio::test]
    async fn test_next_outbound_ends_when_link_dropped() {
        let manager = ClientManager::new();
        let (link, mut worker) = open(&manager, 6);
        drop(link);

        let result = worker.next_outbound(0).await;
        assert!(matches!(result, Err(ProtocolError::SimulationGone)));
    }

    #[test]
    fn test_detach_ignores_replaced_connection() {
        let mut manager = ClientManager::new();
        let (old, _old_worker) = open(&manager, 9);
        let old_id = old.connection_id;
        manager.attach(NestName::Iceland, old);

        let (new, _new_worker) = open(&manager, 10);
        let new_id = new.connection_id;
        manager.attach(NestName::Iceland, new);

        assert!(!manager.detach(NestName::Iceland, old_id));
        assert_eq!(manager.connection_id(NestName::Iceland), Some(new_id));
        assert!(manager.detach(NestName::Iceland, new_id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_replaced_link_closes_old_worker() {
        let mut manager = ClientManager::new();
        let (old, old_worker) = open(&manager, 11);
        manager.attach(NestName::Iceland, old);
        let (new, _new_worker) = open(&manager, 12);
        manager.attach(NestName::Iceland, new);

        let result = old_worker.push_inbound(PacketToServer::reconnect("Fire"));
        assert!(matches!(result, Err(ProtocolError::SimulationGone)));
    }

    #[test]
    fn test_closed_links_detects_dropped_worker() {
        let mut manager = ClientManager::new();
        let (link, worker) = open(&manager, 13);
        let id = link.connection_id;
        manager.attach(NestName::Odense, link);
        assert!(manager.closed_links().is_empty());

        drop(worker);
        assert_eq!(manager.closed_links(), vec![(NestName::Odense, id)]);
        assert!(!manager.push_outbound(NestName::Odense, packet(1)));
    }

    #[test]
    fn test_push_outbound_without_link() {
        let mut manager = ClientManager::new();
        assert!(!manager.push_outbound(NestName::Esbjerg, packet(1)));
        assert!(manager.pop_inbound(NestName::Esbjerg).is_none());
    }
}
