use serde::{Deserialize, Serialize};

use crate::ballot::BallotNumber;
use crate::error::Result;
use crate::{Decree, NodeId, Slot};

/// The five protocol phases on the wire. Each variant carries only the
/// fields its phase consumes; messages are value objects, copied into
/// queues and never shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Phase 1a: a proposer asks every neighbor to promise `ballot` for
    /// `slot`.
    Propose { ballot: BallotNumber, slot: Slot },
    /// Phase 1b: the promise reply, reporting the highest ballot the
    /// sender has voted for within this slot and the decree attached to
    /// that vote, if any.
    Promise {
        ballot: BallotNumber,
        slot: Slot,
        last_voted: Option<BallotNumber>,
        decree: Option<Decree>,
    },
    /// Phase 2a: the proposer polls its quorum to accept `decree` under
    /// `ballot`.
    Accept {
        ballot: BallotNumber,
        slot: Slot,
        decree: Decree,
    },
    /// Phase 2b: an acceptor's vote for the polled ballot.
    Accepted {
        ballot: BallotNumber,
        slot: Slot,
        decree: Decree,
    },
    /// The decision announcement, consumable even by peers outside the
    /// deciding quorum.
    Learn { slot: Slot, decree: Decree },
}

impl Message {
    /// Short phase label, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Propose { .. } => "propose",
            Message::Promise { .. } => "promise",
            Message::Accept { .. } => "accept",
            Message::Accepted { .. } => "accepted",
            Message::Learn { .. } => "learn",
        }
    }

    pub fn slot(&self) -> Slot {
        match self {
            Message::Propose { slot, .. }
            | Message::Promise { slot, .. }
            | Message::Accept { slot, .. }
            | Message::Accepted { slot, .. }
            | Message::Learn { slot, .. } => *slot,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A message together with the peer that sent it, as queued for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub sender: NodeId,
    pub message: Message,
}
