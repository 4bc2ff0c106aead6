//! Server network layer: TCP accept loop and one worker task per connection
//!
//! Workers own their sockets and never touch the game. They talk to the
//! simulation through [`ServerEvent`]s (handshakes and disconnects) and
//! through their [`WorkerEndpoint`] once a nest has been assigned.

use crate::client_manager::{exchange, ClientLink, WorkerEndpoint};
use crate::error::{AssignError, ProtocolError, ServerError};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{
    decode_payload, encode_frame, CodecError, NestName, PacketToClient, PacketToServer,
    MAX_FRAME_LEN,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

/// Messages sent from connection workers to the simulation
#[derive(Debug)]
pub enum ServerEvent {
    /// A client opened with `packet`. The simulation answers on `reply`
    /// and keeps `link` if it accepts.
    Handshake {
        packet: PacketToServer,
        link: ClientLink,
        reply: oneshot::Sender<Result<NestName, AssignError>>,
    },
    /// The worker serving `nest` through `connection_id` has given up.
    Disconnected {
        nest: NestName,
        connection_id: u64,
        reason: String,
    },
}

/// Reads one length-prefixed frame and returns its payload.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await.map_err(closed_or_io)?;
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(len).into());
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(closed_or_io)?;
    Ok(payload)
}

/// Reads and decodes one packet, giving up after `limit`.
pub async fn read_packet<R, T>(reader: &mut R, limit: Duration) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = timeout(limit, read_frame(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    Ok(decode_payload(&payload)?)
}

/// Encodes `packet` as one frame and flushes it.
pub async fn write_packet<W, T>(writer: &mut W, packet: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

fn closed_or_io(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::Closed
    } else {
        ProtocolError::Io(e)
    }
}

/// Accepts connections and spawns a [`Worker`] for each
pub struct Server {
    listener: TcpListener,
    events: mpsc::UnboundedSender<ServerEvent>,
    tick: Arc<AtomicU64>,
    read_timeout: Duration,
    next_connection_id: u64,
}

impl Server {
    /// Binds the listening socket. Failing to bind is fatal for the server.
    pub async fn bind(
        addr: &str,
        events: mpsc::UnboundedSender<ServerEvent>,
        tick: Arc<AtomicU64>,
        read_timeout: Duration,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            events,
            tick,
            read_timeout,
            next_connection_id: 1,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. Only returns if the simulation has gone away.
    pub async fn run(mut self) -> Result<(), ServerError> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };
            if self.events.is_closed() {
                info!("Simulation stopped, closing listener");
                return Ok(());
            }
            if let Err(e) = stream.set_nodelay(true) {
                debug!("Could not disable Nagle for {}: {}", addr, e);
            }

            let connection_id = self.next_connection_id;
            self.next_connection_id += 1;
            info!("Connection {} accepted from {}", connection_id, addr);

            let worker = Worker {
                stream,
                addr,
                connection_id,
                events: self.events.clone(),
                tick: Arc::clone(&self.tick),
                read_timeout: self.read_timeout,
            };
            tokio::spawn(worker.run());
        }
    }
}

/// Serves one client socket from handshake to close
pub struct Worker {
    stream: TcpStream,
    addr: SocketAddr,
    connection_id: u64,
    events: mpsc::UnboundedSender<ServerEvent>,
    tick: Arc<AtomicU64>,
    read_timeout: Duration,
}

impl Worker {
    pub async fn run(mut self) {
        let handshake: PacketToServer = match read_packet(&mut self.stream, self.read_timeout).await
        {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Bad handshake from {}: {}", self.addr, e);
                self.send_error(None, &e.to_string()).await;
                return;
            }
        };

        let (link, endpoint) = exchange(self.connection_id, Arc::clone(&self.tick));
        let (reply_tx, reply_rx) = oneshot::channel();
        let event = ServerEvent::Handshake {
            packet: handshake.clone(),
            link,
            reply: reply_tx,
        };
        if self.events.send(event).is_err() {
            self.send_error(None, &ProtocolError::SimulationGone.to_string())
                .await;
            return;
        }

        let nest = match reply_rx.await {
            Ok(Ok(nest)) => nest,
            Ok(Err(e)) => {
                warn!("Refused {} from {}: {}", handshake.team, self.addr, e);
                self.send_error(None, &e.to_string()).await;
                return;
            }
            Err(_) => {
                self.send_error(None, &ProtocolError::SimulationGone.to_string())
                    .await;
                return;
            }
        };
        info!(
            "Team {} from {} plays nest {} on connection {}",
            handshake.team, self.addr, nest, self.connection_id
        );

        if let Err(e) = self.serve(endpoint, handshake).await {
            warn!("Connection {} ({}) closed: {}", self.connection_id, nest, e);
            let _ = self.events.send(ServerEvent::Disconnected {
                nest,
                connection_id: self.connection_id,
                reason: e.to_string(),
            });
            self.send_error(Some(nest), &e.to_string()).await;
        }
    }

    /// Alternates outbound and inbound packets until something fails.
    async fn serve(
        &mut self,
        mut endpoint: WorkerEndpoint,
        handshake: PacketToServer,
    ) -> Result<(), ProtocolError> {
        let mut pushed_at = endpoint.push_inbound(handshake)?;
        loop {
            let packet = timeout(self.read_timeout, endpoint.next_outbound(pushed_at))
                .await
                .map_err(|_| ProtocolError::Timeout)??;
            write_packet(&mut self.stream, packet.as_ref()).await?;

            let inbound: PacketToServer = read_packet(&mut self.stream, self.read_timeout).await?;
            pushed_at = endpoint.push_inbound(inbound)?;
        }
    }

    /// Best-effort final packet before the socket is dropped.
    async fn send_error(&mut self, nest: Option<NestName>, message: &str) {
        let tick = self.tick.load(Ordering::SeqCst);
        let packet = PacketToClient::error_packet(nest, tick, message);
        if let Err(e) = write_packet(&mut self.stream, &packet).await {
            debug!("Could not send error packet to {}: {}", self.addr, e);
        }
    }
}
