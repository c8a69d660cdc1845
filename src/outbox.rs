use crate::message::{Message, Packet};
use crate::NodeId;

/// One outbound delivery request: either addressed to a single peer or
/// fanned out to every neighbor by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Direct(NodeId, Packet),
    Broadcast(Packet),
}

/// Collects the messages a peer produces during its turn. The driver
/// drains it with [`take_outgoings`](Outbox::take_outgoings) after the
/// peer's round computation; delivery is fire-and-forget.
#[derive(Debug)]
pub struct Outbox {
    self_id: NodeId,
    outgoings: Vec<Outgoing>,
}

impl Outbox {
    pub fn new(self_id: NodeId) -> Self {
        Self {
            self_id,
            outgoings: Vec::new(),
        }
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    pub fn send_to(&mut self, recipient: NodeId, message: Message) {
        let packet = self.pack(message);
        self.outgoings.push(Outgoing::Direct(recipient, packet));
    }

    pub fn broadcast(&mut self, message: Message) {
        let packet = self.pack(message);
        self.outgoings.push(Outgoing::Broadcast(packet));
    }

    fn pack(&self, message: Message) -> Packet {
        Packet {
            sender: self.self_id,
            message,
        }
    }

    pub fn take_outgoings(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoings)
    }

    pub fn is_empty(&self) -> bool {
        self.outgoings.is_empty()
    }

    #[cfg(test)]
    pub fn has_direct(&self, to: NodeId, message: &Message) -> bool {
        self.outgoings.iter().any(|out| match out {
            Outgoing::Direct(recipient, packet) => {
                *recipient == to && &packet.message == message
            }
            Outgoing::Broadcast(_) => false,
        })
    }

    #[cfg(test)]
    pub fn has_broadcast(&self, message: &Message) -> bool {
        self.outgoings.iter().any(|out| match out {
            Outgoing::Broadcast(packet) => &packet.message == message,
            Outgoing::Direct(..) => false,
        })
    }
}
