//! Client network layer and frame loop
//!
//! The client sends fire-and-forget throw rays and renders whatever the
//! server replicates back. Local responsiveness comes from the cosmetic
//! flight and the holster, neither of which waits on the round trip.

use crate::game::{cosmetic_flight, ClientGameState};
use crate::holster::Holster;
use crate::input::{throw_ray, InputManager};
use crate::rendering::Renderer;
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

const HOLSTER_SLIDE_SECONDS: f32 = 0.6;
const FRAME_DT: f32 = 1.0 / 60.0;

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    board_index: Option<u8>,
    connected: bool,

    game_state: ClientGameState,
    input_manager: InputManager,
    holster: Holster,
    renderer: Renderer,

    fake_ping_ms: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
        width: usize,
        height: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;
        let renderer = Renderer::new(width, height)?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            board_index: None,
            connected: false,
            game_state: ClientGameState::new(),
            input_manager: InputManager::new(),
            holster: Holster::new(HOLSTER_SLIDE_SECONDS),
            renderer,
            fake_ping_ms,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");
        self.send_packet(&Packet::Connect {
            client_version: PROTOCOL_VERSION,
        })
        .await
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected {
                client_id,
                board_index,
            } => {
                info!(
                    "Connected! Client ID: {}, throwing at board {}",
                    client_id, board_index
                );
                self.client_id = Some(client_id);
                self.board_index = Some(board_index);
                self.connected = true;
                self.holster.activate();
            }

            Packet::ScoreState { generation, scores } => {
                self.game_state.apply_score_state(generation, scores);
            }

            Packet::ProjectileSpawn { record } => {
                self.game_state.spawn_projectile(record);
            }

            Packet::ProjectileDespawn { id } => {
                self.game_state.despawn_projectile(id);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
                self.board_index = None;
                self.holster.deactivate();
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    async fn throw(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(board_index) = self.board_index else {
            return Ok(());
        };

        let aim = self.input_manager.current_aim(board_index);
        let (origin, direction) = throw_ray(aim, board_index);

        // Immediate local feedback; the authoritative flight follows.
        self.game_state
            .begin_local_flight(cosmetic_flight(origin, direction, now_ms()));

        self.send_packet(&Packet::Throw { origin, direction }).await
    }

    async fn frame(&mut self) {
        self.holster.update(FRAME_DT);

        let input = self.input_manager.update();

        if input.reconnect && !self.connected {
            if let Err(e) = self.connect().await {
                error!("Reconnect failed: {}", e);
            }
        }

        if input.throw_pressed && self.connected && self.holster.try_throw() {
            if let Err(e) = self.throw().await {
                error!("Error sending throw: {}", e);
            }
        }

        let now = now_ms();
        if self.game_state.update(now) {
            self.holster.on_landed();
        }

        let aim = self
            .board_index
            .filter(|_| self.connected)
            .map(|board| self.input_manager.current_aim(board));
        let darts = self.game_state.dart_views(now);
        self.renderer.render(
            &self.game_state.scores,
            &darts,
            aim,
            self.board_index,
            self.holster.state(),
            self.connected,
        );
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut frame_interval = interval(Duration::from_secs_f32(FRAME_DT));
        let mut buffer = [0u8; 2048];

        while self.renderer.is_open() {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet).await;
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = frame_interval.tick() => {
                    self.frame().await;
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}

/// Client wall-clock in unix milliseconds. Flight rendering assumes this
/// stays close to the server's clock.
fn now_ms() -> u64 {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    ms.min(u64::MAX as u128) as u64
}
