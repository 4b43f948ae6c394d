//! Client connections and seat binding
//!
//! The server tracks each connected client, its network address, and the
//! board it owns. Seat binding is an explicit typed registry (seat index ->
//! client identity) populated at connect time; nothing is ever looked up by
//! name. Capacity equals the board count: one thrower per board.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Client {
    pub id: u32,
    pub addr: SocketAddr,
    /// The board this client throws at, 1-based.
    pub board_index: u8,
    /// Last time we received any packet from this client.
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, board_index: u8) -> Self {
        Self {
            id,
            addr,
            board_index,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Connected clients plus the seat registry mapping boards to owners.
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    /// seats[i] owns board i+1.
    seats: Vec<Option<u32>>,
    next_client_id: u32,
}

impl ClientManager {
    pub fn new(board_count: u8) -> Self {
        Self {
            clients: HashMap::new(),
            seats: vec![None; board_count as usize],
            next_client_id: 1,
        }
    }

    /// Seats a new client at the first free board. Returns the assigned
    /// (client_id, board_index), or None when every board is taken.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<(u32, u8)> {
        let seat = self.seats.iter().position(|owner| owner.is_none())?;

        let client_id = self.next_client_id;
        self.next_client_id += 1;
        let board_index = (seat + 1) as u8;

        self.seats[seat] = Some(client_id);
        self.clients
            .insert(client_id, Client::new(client_id, addr, board_index));
        info!(
            "Client {} connected from {}, seated at board {}",
            client_id, addr, board_index
        );
        Some((client_id, board_index))
    }

    /// Removes a client and frees its seat. Returns true if it existed.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            if let Some(owner) = self.seats.get_mut((client.board_index - 1) as usize) {
                *owner = None;
            }
            info!(
                "Client {} disconnected, board {} free",
                client.id, client.board_index
            );
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Marks a client as alive; returns false for unknown clients.
    pub fn touch(&mut self, client_id: u32) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.touch();
            true
        } else {
            false
        }
    }

    pub fn board_for(&self, client_id: u32) -> Option<u8> {
        self.clients.get(&client_id).map(|c| c.board_index)
    }

    /// Seat registry lookup: the client currently owning a board.
    pub fn owner_of_board(&self, board_index: u8) -> Option<u32> {
        self.seats.get(board_index.checked_sub(1)? as usize)?.as_ref().copied()
    }

    /// Removes clients that have gone silent; returns their ids.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(CLIENT_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
