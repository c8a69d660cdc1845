use std::collections::{BTreeSet, VecDeque};

use log::{debug, trace};
use rand::Rng;

use crate::ballot::{BallotClock, BallotNumber};
use crate::ledger::{ConfirmedLog, Ledger, Paper, PromiseVote, Status};
use crate::message::{Message, Packet};
use crate::metrics::RoundMetrics;
use crate::outbox::{Outbox, Outgoing};
use crate::{Decree, NodeId, Slot};

/// Retry timeout used until the round aggregator observes the first
/// completed slot and starts tuning it adaptively.
const INITIAL_MESSAGE_WAIT: u64 = 4;

/// Crash-injection tuning. A rate of `n` gives a one-in-`n` draw each
/// round; zero disables that transition. Recovery is only ever attempted
/// when crash injection itself is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultConfig {
    pub crash_rate: u32,
    pub recovery_rate: u32,
}

/// A single Paxos participant.
///
/// The driver invokes [`step`](Peer::step) exactly once per round; within
/// a round the peer drains its inbound queue, may start or retry a ballot,
/// and may crash or recover. All output accumulates in the outbox until
/// the driver drains it with [`take_outgoings`](Peer::take_outgoings).
#[derive(Debug)]
pub struct Peer {
    id: NodeId,
    neighbors: BTreeSet<NodeId>,
    faults: FaultConfig,

    ledger: Ledger,
    paper: Paper,
    clock: BallotClock,
    confirmed: ConfirmedLog,

    inbox: VecDeque<Packet>,
    outbox: Outbox,

    /// Idle rounds to wait before retrying a proposal; shared across
    /// peers via the round aggregator.
    message_wait: u64,
    /// Round of this peer's latest proposal broadcast, for latency
    /// accounting.
    round_sent: u64,
    throughput: u64,
    latency: u64,
}

impl Peer {
    pub fn new(id: NodeId, neighbors: BTreeSet<NodeId>, faults: FaultConfig) -> Self {
        Self {
            id,
            neighbors,
            faults,
            ledger: Ledger::open(0),
            paper: Paper::default(),
            clock: BallotClock::new(id),
            confirmed: ConfirmedLog::default(),
            inbox: VecDeque::new(),
            outbox: Outbox::new(id),
            message_wait: INITIAL_MESSAGE_WAIT,
            round_sent: 0,
            throughput: 0,
            latency: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn neighbors(&self) -> &BTreeSet<NodeId> {
        &self.neighbors
    }

    pub fn status(&self) -> Status {
        self.paper.status
    }

    pub fn is_crashed(&self) -> bool {
        self.paper.status == Status::Crashed
    }

    pub fn current_slot(&self) -> Slot {
        self.ledger.current_slot
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn confirmed(&self) -> &ConfirmedLog {
        &self.confirmed
    }

    pub fn message_wait(&self) -> u64 {
        self.message_wait
    }

    /// Reconfigure fault injection; takes effect from the next round.
    pub fn set_faults(&mut self, faults: FaultConfig) {
        self.faults = faults;
    }

    /// Transport entry point: queue one inbound packet. Packets delivered
    /// while crashed stay queued and are processed after recovery.
    pub fn deliver(&mut self, packet: Packet) {
        self.inbox.push_back(packet);
    }

    /// Drain the outbox; called by the driver after this peer's turn.
    pub fn take_outgoings(&mut self) -> Vec<Outgoing> {
        self.outbox.take_outgoings()
    }

    /// The per-round computation: handle inbound messages, then possibly
    /// start or retry a ballot, then roll the fault dice. `round` is the
    /// driver's global round counter.
    pub fn step(&mut self, round: u64, rng: &mut impl Rng) {
        self.drain_inbox(round, rng);
        self.drive_ballot(round);
        self.inject_fault(rng);
    }

    fn drain_inbox(&mut self, round: u64, rng: &mut impl Rng) {
        while self.paper.status != Status::Crashed {
            let packet = match self.inbox.pop_front() {
                Some(packet) => packet,
                None => break,
            };
            self.handle_packet(packet, round, rng);
        }
    }

    fn handle_packet(&mut self, packet: Packet, round: u64, rng: &mut impl Rng) {
        let Packet { sender, message } = packet;
        trace!(
            "peer {} got {} from {}: {:?}",
            self.id,
            message.kind(),
            sender,
            message
        );
        match message {
            Message::Propose { ballot, slot } => self.on_propose(sender, ballot, slot),
            Message::Promise {
                slot,
                last_voted,
                decree,
                ..
            } => self.on_promise(sender, slot, last_voted, decree, rng),
            Message::Accept {
                ballot,
                slot,
                decree,
            } => self.on_accept(sender, ballot, slot, decree),
            Message::Accepted { slot, decree, .. } => {
                self.on_accepted(sender, slot, decree, round)
            }
            Message::Learn { slot, decree } => self.on_learn(slot, decree),
        }
    }

    /// Phase 1a received: promise the ballot if it beats both our own
    /// attempt and everything we have already promised. A higher ballot
    /// always preempts an in-flight attempt.
    fn on_propose(&mut self, sender: NodeId, ballot: BallotNumber, slot: Slot) {
        if slot != self.ledger.current_slot {
            return;
        }
        if Some(ballot) <= self.ledger.next_bal || Some(ballot) <= self.ledger.last_tried {
            trace!("peer {} ignores stale ballot {} from {}", self.id, ballot, sender);
            return;
        }

        if self.paper.status != Status::Idle {
            debug!(
                "peer {} preempted by ballot {} from {}",
                self.id, ballot, sender
            );
            self.paper.reset();
        }
        self.paper.timer = 0;
        self.ledger.next_bal = Some(ballot);

        let reply = Message::Promise {
            ballot,
            slot,
            last_voted: self.ledger.prev_bal,
            decree: self.ledger.decree.clone(),
        };
        self.outbox.send_to(sender, reply);
    }

    /// Phase 1b received: collect the reply and, once enough neighbors
    /// have promised, move to polling.
    fn on_promise(
        &mut self,
        sender: NodeId,
        slot: Slot,
        last_voted: Option<BallotNumber>,
        decree: Option<Decree>,
        rng: &mut impl Rng,
    ) {
        if slot != self.ledger.current_slot || self.paper.status != Status::Trying {
            return;
        }
        self.paper.prev_votes.push(PromiseVote {
            voter: sender,
            last_voted,
            decree,
        });

        // Half the neighbors suffices: together with the proposer's own
        // implicit vote that is floor(n/2) + 1 of the full cluster.
        if self.paper.prev_votes.len() >= self.neighbors.len() / 2 {
            self.begin_poll(rng);
        }
    }

    /// Promise majority reached: pick the decree, fix the quorum, and
    /// poll it. Entering `Polling` closes the door on further promises,
    /// so this runs at most once per attempt.
    fn begin_poll(&mut self, rng: &mut impl Rng) {
        let ballot = match self.ledger.last_tried {
            Some(ballot) => ballot,
            None => return, // no attempt of ours to poll for
        };

        // A quorum member that has voted before binds us to the decree of
        // the highest such vote; otherwise any fresh decree will do.
        let inherited = self
            .paper
            .prev_votes
            .iter()
            .max_by_key(|vote| vote.last_voted)
            .and_then(|vote| vote.decree.clone());
        let decree = inherited.unwrap_or_else(|| random_decree(rng));

        self.paper.status = Status::Polling;
        self.paper.voters.clear();
        self.paper.quorum = self.paper.prev_votes.iter().map(|vote| vote.voter).collect();
        self.paper.decree = Some(decree.clone());

        debug!(
            "peer {} polls {:?} with decree {:?} under ballot {}",
            self.id, self.paper.quorum, decree, ballot
        );
        let slot = self.ledger.current_slot;
        for member in self.paper.quorum.clone() {
            self.outbox.send_to(
                member,
                Message::Accept {
                    ballot,
                    slot,
                    decree: decree.clone(),
                },
            );
        }
    }

    /// Phase 2a received: vote for the polled ballot if it is exactly the
    /// one we promised and moves us forward.
    fn on_accept(&mut self, sender: NodeId, ballot: BallotNumber, slot: Slot, decree: Decree) {
        if slot != self.ledger.current_slot {
            return;
        }
        if Some(ballot) != self.ledger.next_bal || Some(ballot) <= self.ledger.prev_bal {
            trace!("peer {} ignores poll for ballot {}", self.id, ballot);
            return;
        }

        self.ledger.prev_bal = Some(ballot);
        self.ledger.decree = Some(decree.clone());
        self.paper.timer = 0;

        self.outbox.send_to(
            sender,
            Message::Accepted {
                ballot,
                slot,
                decree,
            },
        );
    }

    /// Phase 2b received: count the voter; once the whole quorum has
    /// voted, the decree is decided.
    fn on_accepted(&mut self, sender: NodeId, slot: Slot, decree: Decree, round: u64) {
        if slot != self.ledger.current_slot || self.paper.status != Status::Polling {
            return;
        }
        self.paper.voters.insert(sender);
        if self.paper.voters.len() != self.paper.prev_votes.len() {
            return;
        }

        debug!(
            "peer {} decided slot {} with decree {:?}",
            self.id, slot, decree
        );
        self.ledger.outcome = Some(decree.clone());
        self.outbox.broadcast(Message::Learn {
            slot,
            decree: decree.clone(),
        });

        self.latency += round - self.round_sent;
        self.throughput += 1;

        self.confirmed.record(slot, decree);
        self.advance_slot(self.ledger.current_slot + 1);
    }

    /// Decision announcement received. No guards: a decided slot is
    /// decided, even if this peer is behind or mid-attempt; this is how a
    /// peer outside the quorum catches up.
    fn on_learn(&mut self, slot: Slot, decree: Decree) {
        debug!(
            "peer {} learns slot {} decided with decree {:?}",
            self.id, slot, decree
        );
        self.ledger.outcome = Some(decree.clone());
        self.confirmed.record(slot, decree);
        self.advance_slot(self.ledger.current_slot + 1);
    }

    /// The slot is settled: reopen the ledger at `slot` and clear the
    /// working state. Only the slot number survives the reset.
    fn advance_slot(&mut self, slot: Slot) {
        self.ledger = Ledger::open(slot);
        self.paper.reset();
    }

    /// Once per round: start a ballot immediately if we have never issued
    /// a promise, otherwise retry only after sitting idle past the
    /// adaptive timeout.
    fn drive_ballot(&mut self, round: u64) {
        if self.paper.status != Status::Idle {
            return;
        }
        if self.ledger.next_bal.is_none() {
            self.propose(round);
        } else if self.paper.timer > self.message_wait {
            self.propose(round);
        } else {
            self.paper.timer += 1;
        }
    }

    /// Start a fresh attempt: mint the next ballot, move to trying, and
    /// ask every neighbor to promise it.
    fn propose(&mut self, round: u64) {
        let ballot = self.clock.next(self.ledger.next_bal);
        self.ledger.last_tried = Some(ballot);

        self.paper.status = Status::Trying;
        self.paper.prev_votes.clear();
        self.paper.quorum.clear();
        self.paper.voters.clear();

        debug!(
            "peer {} proposes ballot {} for slot {}",
            self.id, ballot, self.ledger.current_slot
        );
        self.outbox.broadcast(Message::Propose {
            ballot,
            slot: self.ledger.current_slot,
        });
        self.round_sent = round;
    }

    /// Roll the fault dice. A crash wipes the in-flight attempt but keeps
    /// the ledger and the confirmed history verbatim; recovery resumes
    /// idle from the preserved slot.
    fn inject_fault(&mut self, rng: &mut impl Rng) {
        if self.faults.crash_rate == 0 {
            return;
        }
        if self.paper.status != Status::Crashed && rng.gen_range(0, self.faults.crash_rate) == 0 {
            debug!("peer {} crashes", self.id);
            self.paper.reset();
            self.paper.status = Status::Crashed;
        } else if self.paper.status == Status::Crashed
            && self.faults.recovery_rate != 0
            && rng.gen_range(0, self.faults.recovery_rate) == 0
        {
            debug!("peer {} recovers", self.id);
            self.paper.status = Status::Idle;
        }
    }
}

impl RoundMetrics for Peer {
    fn throughput(&self) -> u64 {
        self.throughput
    }

    fn latency(&self) -> u64 {
        self.latency
    }

    fn set_message_wait(&mut self, wait: u64) {
        self.message_wait = wait;
    }
}

/// Fallback decree when no quorum member has voted before: a single
/// letter drawn from the PRNG.
fn random_decree(rng: &mut impl Rng) -> Decree {
    let letter = b'A' + rng.gen_range(0, 26u8);
    (letter as char).to_string()
}

#[cfg(test)]
#[path = "./peer_tests.rs"]
mod tests;
