use core::fmt;

use serde::{Deserialize, Serialize};

use crate::NodeId;

/// Identity of one proposal attempt. Ballots are totally ordered by
/// `(index, proposer)`: two peers that independently reach the same index
/// are tie-broken by their ids, so no two distinct attempts ever compare
/// equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BallotNumber {
    pub index: u64,
    pub proposer: NodeId,
}

impl BallotNumber {
    pub fn new(index: u64, proposer: NodeId) -> Self {
        Self { index, proposer }
    }
}

impl fmt::Debug for BallotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}.{}", self.index, self.proposer)
    }
}

impl fmt::Display for BallotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.proposer)
    }
}

/// Source of this peer's ballot numbers. The index only ever moves
/// forward: each call returns a ballot strictly greater than every ballot
/// this peer has emitted and strictly greater than the highest index it
/// has promised to honor. The counter is peer-private state; it survives
/// slot completion and injected crashes alike.
#[derive(Debug, Clone)]
pub struct BallotClock {
    proposer: NodeId,
    last_index: u64,
}

impl BallotClock {
    pub fn new(proposer: NodeId) -> Self {
        Self {
            proposer,
            last_index: 0,
        }
    }

    /// Mint the next ballot, given the highest ballot this peer has
    /// promised (if any). A fresh clock with no promise outstanding
    /// starts at index 1.
    pub fn next(&mut self, promised: Option<BallotNumber>) -> BallotNumber {
        let promised_index = promised.map(|b| b.index).unwrap_or(0);
        self.last_index = self.last_index.max(promised_index) + 1;
        BallotNumber::new(self.last_index, self.proposer)
    }
}
