//! Server network layer: UDP plumbing and the authoritative event loop
//!
//! All shared state is mutated from a single select loop. Throw requests
//! are resolved synchronously on arrival; only the resulting score commit
//! is deferred, waiting in the commit queue until its flight lands.

use crate::client_manager::ClientManager;
use crate::commit_queue::{CommitQueue, PendingCommit};
use crate::ledger::{CommitOutcome, ScoreLedger};
use crate::resolver::{HitResolver, ResolverConfig, ThrowRequest};
use crate::world::World;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, ProjectileRecord, BOARD_COUNT};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Instant};

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    /// Requests from the external turn/phase orchestrator.
    Control(ControlCommand),
    #[allow(dead_code)]
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    ResetScores,
    SetMinigameActive(bool),
}

/// Messages sent from the game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Handle given to the external orchestrator; commands enter the event
/// loop through the same channel as network traffic, so all mutation
/// stays single-threaded.
#[derive(Clone)]
pub struct ServerControl {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerControl {
    pub fn reset_scores(&self) {
        if self
            .tx
            .send(ServerMessage::Control(ControlCommand::ResetScores))
            .is_err()
        {
            error!("Server loop gone; reset_scores dropped");
        }
    }

    pub fn set_minigame_active(&self, active: bool) {
        if self
            .tx
            .send(ServerMessage::Control(ControlCommand::SetMinigameActive(
                active,
            )))
            .is_err()
        {
            error!("Server loop gone; set_minigame_active dropped");
        }
    }
}

/// A live replicated projectile and when to tear it down.
#[derive(Debug)]
struct ActiveProjectile {
    record: ProjectileRecord,
    despawn_at: Instant,
}

/// Main server coordinating networking and throw resolution
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    ledger: ScoreLedger,
    resolver: HitResolver,
    commits: CommitQueue,
    projectiles: Vec<ActiveProjectile>,
    next_projectile_id: u32,
    minigame_active: bool,
    starting_score: u32,
    tick: u64,
    tick_duration: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        starting_score: u32,
        exact_finish: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(BOARD_COUNT))),
            ledger: ScoreLedger::new(BOARD_COUNT, starting_score, exact_finish),
            resolver: HitResolver::new(World::standard(), ResolverConfig::default()),
            commits: CommitQueue::new(),
            projectiles: Vec::new(),
            next_projectile_id: 1,
            minigame_active: true,
            starting_score,
            tick: 0,
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Bound address, useful when listening on an ephemeral port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for the external turn/phase orchestrator.
    pub fn control(&self) -> ServerControl {
        ServerControl {
            tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<u32>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn broadcast_score_state(&self) {
        let packet = Packet::ScoreState {
            generation: self.ledger.generation(),
            scores: self.ledger.scores().to_vec(),
        };
        self.broadcast_packet(&packet, None).await;
    }

    /// Processes incoming packets and updates game state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                // Remove existing connection if present
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                }

                let seated = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match seated {
                    Some((client_id, board_index)) => {
                        self.send_packet(
                            &Packet::Connected {
                                client_id,
                                board_index,
                            },
                            addr,
                        )
                        .await;

                        // Late-joiner sync: current scores plus every live
                        // flight. Records are write-once, so the new client
                        // renders the remainder of each arc correctly.
                        self.send_packet(
                            &Packet::ScoreState {
                                generation: self.ledger.generation(),
                                scores: self.ledger.scores().to_vec(),
                            },
                            addr,
                        )
                        .await;
                        for active in &self.projectiles {
                            self.send_packet(
                                &Packet::ProjectileSpawn {
                                    record: active.record.clone(),
                                },
                                addr,
                            )
                            .await;
                        }
                    }
                    None => {
                        self.send_packet(
                            &Packet::Disconnected {
                                reason: "Server full".to_string(),
                            },
                            addr,
                        )
                        .await;
                    }
                }
            }

            Packet::Throw { origin, direction } => {
                let client_id = {
                    let mut clients = self.clients.write().await;
                    let id = clients.find_client_by_addr(addr);
                    if let Some(id) = id {
                        clients.touch(id);
                    }
                    id
                };

                let Some(client_id) = client_id else {
                    warn!("Throw from unknown address {}", addr);
                    return;
                };

                if !self.minigame_active {
                    debug!("Ignoring throw from {}: minigame inactive", client_id);
                    return;
                }

                self.resolve_throw(ThrowRequest {
                    origin,
                    direction,
                    requester_id: client_id,
                })
                .await;
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Authoritative resolution of one throw: re-cast, decode, validate,
    /// replicate the flight, and defer the score to landing time.
    async fn resolve_throw(&mut self, request: ThrowRequest) {
        let projectile_id = self.next_projectile_id;
        self.next_projectile_id += 1;

        let resolution = self.resolver.resolve(&request, projectile_id, now_ms());

        self.broadcast_packet(
            &Packet::ProjectileSpawn {
                record: resolution.record.clone(),
            },
            None,
        )
        .await;

        let despawn_at = Instant::now() + Duration::from_secs_f32(resolution.record.lifetime());
        self.projectiles.push(ActiveProjectile {
            record: resolution.record,
            despawn_at,
        });

        if let Some(pending) = resolution.pending {
            self.commits.schedule(PendingCommit {
                board_index: pending.board_index,
                value: pending.value,
                commit_at: Instant::now() + Duration::from_secs_f32(pending.delay),
                generation: self.ledger.generation(),
            });
        }
    }

    /// Applies every commit whose flight has landed, in deadline order.
    async fn apply_due_commits(&mut self) {
        let now = Instant::now();
        while let Some(commit) = self.commits.pop_due(now) {
            if commit.generation != self.ledger.generation() {
                debug!(
                    "Discarding stale commit for board {} (generation {} != {})",
                    commit.board_index,
                    commit.generation,
                    self.ledger.generation()
                );
                continue;
            }

            match self.ledger.commit(commit.board_index, commit.value) {
                CommitOutcome::Applied(_) => self.broadcast_score_state().await,
                // Bust stays wire-silent: observable as "no change".
                CommitOutcome::Bust => {}
                CommitOutcome::InvalidBoard => {
                    warn!("Commit targeted unknown board {}", commit.board_index)
                }
            }
        }
    }

    /// Tears down projectiles whose stick life has elapsed.
    async fn despawn_expired(&mut self) {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.projectiles.retain(|active| {
            if active.despawn_at <= now {
                expired.push(active.record.id);
                false
            } else {
                true
            }
        });

        for id in expired {
            self.broadcast_packet(&Packet::ProjectileDespawn { id }, None)
                .await;
        }
    }

    async fn handle_control(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::ResetScores => {
                self.ledger.reset(self.starting_score);
                // Outstanding commits from the old game become stale via
                // the generation bump; live darts are cleared outright.
                for active in self.projectiles.drain(..) {
                    let packet = Packet::ProjectileDespawn {
                        id: active.record.id,
                    };
                    if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
                        packet,
                        exclude: None,
                    }) {
                        error!("Failed to queue despawn broadcast: {}", e);
                    }
                }
                self.broadcast_score_state().await;
            }
            ControlCommand::SetMinigameActive(active) => {
                info!("Minigame active: {}", active);
                self.minigame_active = active;
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                        },
                        Some(ServerMessage::Control(command)) => {
                            self.handle_control(command).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.apply_due_commits().await;
                    self.despawn_expired().await;
                    self.tick += 1;

                    if self.tick % 300 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };
                        if client_count > 0 || !self.commits.is_empty() {
                            debug!(
                                "Tick {}: {} clients, {} pending commits, {} live darts",
                                self.tick, client_count, self.commits.len(), self.projectiles.len()
                            );
                        }
                    }
                },
            }
        }

        Ok(())
    }
}

/// Server wall-clock in unix milliseconds, as stamped into records.
fn now_ms() -> u64 {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    ms.min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vec3;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_server_message_throw() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);
        let msg = ServerMessage::PacketReceived {
            packet: Packet::Throw {
                origin: Vec3::new(0.0, 1.5, 0.0),
                direction: Vec3::FORWARD,
            },
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { packet, addr: a } => {
                assert_eq!(a, addr);
                assert!(matches!(packet, Packet::Throw { .. }));
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_control_handle_feeds_event_loop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let control = ServerControl { tx };

        control.reset_scores();
        control.set_minigame_active(false);

        match rx.try_recv().unwrap() {
            ServerMessage::Control(ControlCommand::ResetScores) => {}
            other => panic!("Unexpected message: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            ServerMessage::Control(ControlCommand::SetMinigameActive(false)) => {}
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        std::thread::sleep(Duration::from_millis(2));
        let b = now_ms();
        assert!(b > a);
    }

    #[test]
    fn test_broadcast_message_shape() {
        let packet = Packet::ScoreState {
            generation: 1,
            scores: vec![501; 5],
        };
        let msg = GameMessage::BroadcastPacket {
            packet,
            exclude: Some(3),
        };

        match msg {
            GameMessage::BroadcastPacket { packet, exclude } => {
                assert_eq!(exclude, Some(3));
                assert!(matches!(packet, Packet::ScoreState { .. }));
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[tokio::test]
    async fn test_server_binds_and_exposes_control() {
        let server = Server::new("127.0.0.1:0", Duration::from_millis(16), 501, true)
            .await
            .expect("bind failed");
        assert_eq!(server.ledger.scores(), &[501; BOARD_COUNT as usize]);
        assert!(server.minigame_active);

        // Control commands queue onto the loop channel.
        server.control().reset_scores();
    }

    #[tokio::test]
    async fn test_resolve_throw_schedules_commit_and_projectile() {
        let mut server = Server::new("127.0.0.1:0", Duration::from_millis(16), 501, true)
            .await
            .expect("bind failed");

        let center = shared::board_center(1);
        server
            .resolve_throw(ThrowRequest {
                origin: Vec3::new(center.x, center.y, 0.0),
                direction: Vec3::FORWARD,
                requester_id: 1,
            })
            .await;

        assert_eq!(server.projectiles.len(), 1);
        assert_eq!(server.commits.len(), 1);
        assert_eq!(server.next_projectile_id, 2);
    }

    #[tokio::test]
    async fn test_stale_commit_discarded_after_reset() {
        let mut server = Server::new("127.0.0.1:0", Duration::from_millis(16), 501, true)
            .await
            .expect("bind failed");

        server.commits.schedule(PendingCommit {
            board_index: 1,
            value: 60,
            commit_at: Instant::now(),
            generation: server.ledger.generation(),
        });
        server.ledger.reset(501);

        server.apply_due_commits().await;
        assert_eq!(server.ledger.score(1), Some(501));
        assert!(server.commits.is_empty());
    }
}
