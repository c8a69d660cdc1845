use std::collections::{BTreeMap, BTreeSet};

use crate::ballot::BallotNumber;
use crate::{Decree, NodeId, Slot};

/// Where the peer stands in its current ballot attempt. `Crashed` is
/// orthogonal to the protocol phases: it is reachable from any of the
/// other three and only ever exits to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Trying,
    Polling,
    Crashed,
}

impl Default for Status {
    fn default() -> Self {
        Status::Idle
    }
}

/// The durable per-slot record. A crash preserves it verbatim; completing
/// a slot reopens it for the next one, with only the slot number carried
/// forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    /// The slot this peer is currently trying to decide.
    pub current_slot: Slot,
    /// Highest ballot this peer has promised to honor.
    pub next_bal: Option<BallotNumber>,
    /// Highest ballot this peer has itself attempted.
    pub last_tried: Option<BallotNumber>,
    /// Highest ballot this peer has voted for within the current slot.
    pub prev_bal: Option<BallotNumber>,
    /// The decree attached to `prev_bal`'s vote.
    pub decree: Option<Decree>,
    /// The decree learned as decided for `current_slot`, once consensus
    /// completes.
    pub outcome: Option<Decree>,
}

impl Ledger {
    /// Canonical ledger for a freshly opened slot.
    pub fn open(slot: Slot) -> Self {
        Ledger {
            current_slot: slot,
            next_bal: None,
            last_tried: None,
            prev_bal: None,
            decree: None,
            outcome: None,
        }
    }
}

/// One promise reply, as recorded while trying a ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromiseVote {
    pub voter: NodeId,
    pub last_voted: Option<BallotNumber>,
    pub decree: Option<Decree>,
}

/// The transient ballot bookkeeping ("paper"). Reset whenever an attempt
/// is abandoned, a slot completes, or the peer crashes; never consulted
/// while crashed.
#[derive(Debug, Clone, Default)]
pub struct Paper {
    pub status: Status,
    /// Rounds spent idle since the last attempt.
    pub timer: u64,
    /// Peers polled in the accept phase.
    pub quorum: BTreeSet<NodeId>,
    /// Promise replies received while trying.
    pub prev_votes: Vec<PromiseVote>,
    /// Peers whose accepted reply has arrived while polling.
    pub voters: BTreeSet<NodeId>,
    /// The candidate decree being polled.
    pub decree: Option<Decree>,
}

impl Paper {
    /// Back to the canonical initial working state.
    pub fn reset(&mut self) {
        *self = Paper::default();
    }
}

/// Append-only record of decided slots. The first decree recorded for a
/// slot wins; a duplicate announcement for the same slot is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmedLog {
    decrees: BTreeMap<Slot, Decree>,
}

impl ConfirmedLog {
    pub fn record(&mut self, slot: Slot, decree: Decree) {
        self.decrees.entry(slot).or_insert(decree);
    }

    pub fn get(&self, slot: Slot) -> Option<&Decree> {
        self.decrees.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.decrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decrees.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &Decree)> {
        self.decrees.iter().map(|(slot, decree)| (*slot, decree))
    }
}
