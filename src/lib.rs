//! A single participant in the classic multi-phase Paxos (Synod)
//! protocol, driven one discrete round at a time by an external
//! simulation loop.
//!
//! Nothing here blocks and nothing owns a clock: "waiting" is a count of
//! idle rounds, and all coordination between peers happens through
//! value-object [`Packet`]s copied into queues the driver owns. Each round
//! the driver pushes matured packets into a peer with [`Peer::deliver`],
//! invokes [`Peer::step`] exactly once, and drains the peer's outbox with
//! [`Peer::take_outgoings`]. Between rounds, [`aggregate_round`] folds
//! every peer's counters into the metrics sink and feeds the shared retry
//! timeout back.
//!
//! Peers decide one decree per slot and pipeline slots sequentially; the
//! per-slot record lives in a [`Ledger`] that survives injected crashes,
//! while the in-flight ballot bookkeeping lives on a [`Paper`] that does
//! not.

pub mod ballot;
pub mod error;
pub mod ledger;
pub mod message;
pub mod metrics;
pub mod outbox;
pub mod peer;

pub use ballot::{BallotClock, BallotNumber};
pub use error::{Error, Result};
pub use ledger::{ConfirmedLog, Ledger, Paper, PromiseVote, Status};
pub use message::{Message, Packet};
pub use metrics::{aggregate_round, MetricsSink, RoundMetrics, TimeSeriesLog};
pub use outbox::{Outbox, Outgoing};
pub use peer::{FaultConfig, Peer};

/// Stable peer identifier; doubles as the ballot tie-break.
pub type NodeId = usize;

/// Consensus instance number. Peers work on one slot at a time and move to
/// the next once the current one is decided.
pub type Slot = u64;

/// The value being agreed on for a slot.
pub type Decree = String;
