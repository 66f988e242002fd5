use std::sync::atomic::{AtomicU64, Ordering};

use crate::entity::{Character, EntityId, Player};
use crate::geom::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

/// Live session as seen by the simulation. Shared with the network layer, which
/// bumps the keep-alive from its own thread.
#[derive(Debug)]
pub struct NetworkConnection {
    id: ConnectionId,
    last_keep_alive_bits: AtomicU64,
}

impl NetworkConnection {
    pub fn new(id: ConnectionId, now_seconds: f64) -> Self {
        Self {
            id,
            last_keep_alive_bits: AtomicU64::new(now_seconds.to_bits()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn last_keep_alive(&self) -> f64 {
        f64::from_bits(self.last_keep_alive_bits.load(Ordering::Relaxed))
    }

    pub fn touch_keep_alive(&self, now_seconds: f64) {
        self.last_keep_alive_bits
            .store(now_seconds.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    ChangeMap {
        entity_id: EntityId,
        map_code: String,
        position: Position,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPacket {
    pub connection: ConnectionId,
    pub message: ServerMessage,
}

/// Per-world outbound staging. Systems target a message by adding recipients and
/// then sending; the tick must end with no recipients left over.
#[derive(Debug, Default)]
pub struct OutboundBuffer {
    recipients: Vec<ConnectionId>,
    outbox: Vec<OutboundPacket>,
}

impl OutboundBuffer {
    pub fn add_recipient(&mut self, connection: ConnectionId) {
        if !self.recipients.contains(&connection) {
            self.recipients.push(connection);
        }
    }

    pub fn has_recipients(&self) -> bool {
        !self.recipients.is_empty()
    }

    pub fn clear_recipients(&mut self) {
        self.recipients.clear();
    }

    /// Queues `message` for every staged recipient and clears the recipient list.
    pub fn send_to_recipients(&mut self, message: ServerMessage) {
        for connection in self.recipients.drain(..) {
            self.outbox.push(OutboundPacket {
                connection,
                message: message.clone(),
            });
        }
    }

    /// Stages `player` and sends it the map it now stands on.
    pub fn send_change_map(&mut self, character: &Character, map_code: &str, player: &Player) {
        self.add_recipient(player.connection.id());
        self.send_to_recipients(ServerMessage::ChangeMap {
            entity_id: character.id,
            map_code: map_code.to_string(),
            position: character.position,
        });
    }

    pub fn take_outbox(&mut self) -> Vec<OutboundPacket> {
        std::mem::take(&mut self.outbox)
    }
}
