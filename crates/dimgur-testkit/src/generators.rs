//! Proptest generators for property-based testing.

use std::collections::HashSet;

use proptest::prelude::*;

use dimgur_core::{Conflict, Keypair, PostId, VoteAction, VoteState};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a valid post id.
pub fn post_id() -> impl Strategy<Value = PostId> {
    "[A-Za-z0-9_-]{1,64}".prop_map(|s| PostId::parse(s).expect("generated id is url-safe"))
}

/// Generate a vote action.
pub fn vote_action() -> impl Strategy<Value = VoteAction> {
    prop_oneof![Just(VoteAction::Add), Just(VoteAction::Remove)]
}

/// Generate message bytes of specified max length.
pub fn message(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// One step of a ledger sequence: voter index and declared action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerOp {
    pub voter: usize,
    pub action: VoteAction,
}

/// Generate a sequence of ledger operations over `voters` distinct voters.
pub fn ledger_ops(voters: usize, max_len: usize) -> impl Strategy<Value = Vec<LedgerOp>> {
    prop::collection::vec(
        (0..voters, vote_action()).prop_map(|(voter, action)| LedgerOp { voter, action }),
        0..=max_len,
    )
}

/// Reference model of one ledger: the set of voters with a vote.
#[derive(Debug, Default, Clone)]
pub struct LedgerModel {
    voted: HashSet<usize>,
}

impl LedgerModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an operation, returning the new count or the conflict.
    pub fn apply(&mut self, op: LedgerOp) -> Result<u64, Conflict> {
        let state = VoteState::from_voted(self.voted.contains(&op.voter));
        match state.apply(op.action)? {
            VoteState::Voted => self.voted.insert(op.voter),
            VoteState::NoVote => self.voted.remove(&op.voter),
        };
        Ok(self.count())
    }

    pub fn count(&self) -> u64 {
        self.voted.len() as u64
    }

    pub fn has_voted(&self, voter: usize) -> bool {
        self.voted.contains(&voter)
    }
}
