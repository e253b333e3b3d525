//! The peer-message reaction table
//!
//! Pure dispatch: a message plus the ledger produces an optional direct
//! reply for the sending peer and a list of messages to broadcast.
//! Socket mechanics stay with the transport collaborator; connection
//! consequences of a rejected input are its call too.

use crate::core::ledger::{ForkOutcome, Ledger};
use crate::core::block::Block;
use crate::network::message::Message;

/// What a handled message asks the transport to do
#[derive(Debug, Default)]
pub struct Reaction {
    /// Direct reply to the peer the message came from
    pub reply: Option<Message>,
    /// Messages for every connected peer
    pub broadcast: Vec<Message>,
}

impl Reaction {
    fn reply(message: Message) -> Self {
        Self {
            reply: Some(message),
            broadcast: Vec::new(),
        }
    }

    fn broadcast(messages: Vec<Message>) -> Self {
        Self {
            reply: None,
            broadcast: messages,
        }
    }
}

/// Apply a peer message to the ledger and report the required replies
pub fn react(ledger: &mut Ledger, message: Message) -> Reaction {
    match message {
        Message::QueryLatest => Reaction::reply(Message::LatestBlock(ledger.latest_block().clone())),
        Message::LatestBlock(block) => handle_block(ledger, block),
        Message::QueryChain => Reaction::reply(Message::Chain(ledger.chain().to_vec())),
        Message::Chain(blocks) => handle_chain(ledger, blocks),
        Message::NewTransaction(tx) => {
            match ledger.accept_transaction(tx) {
                Ok(()) => log::debug!("pooled transaction from peer"),
                Err(reason) => log::warn!("refusing peer transaction: {}", reason),
            }
            Reaction::default()
        }
    }
}

/// A single delivered block: append it if it links onto the tail, ask
/// for the full chain if the peer is ahead, ignore it otherwise.
fn handle_block(ledger: &mut Ledger, block: Block) -> Reaction {
    let tail = ledger.latest_block();

    if block.previous_hash == tail.hash {
        match ledger.append_block(block) {
            Ok(()) => {}
            Err(reason) => log::warn!("refusing peer block: {}", reason),
        }
        Reaction::default()
    } else if block.index > tail.index {
        log::info!(
            "peer block {} is ahead of tail {}, requesting full chain",
            block.index,
            tail.index
        );
        Reaction::reply(Message::QueryChain)
    } else {
        log::debug!("ignoring peer block {} behind tail {}", block.index, tail.index);
        Reaction::default()
    }
}

/// A delivered chain goes to fork resolution; adopting it obliges us to
/// rebroadcast every transaction the losing chain carried alone.
fn handle_chain(ledger: &mut Ledger, blocks: Vec<Block>) -> Reaction {
    match ledger.replace_chain(blocks) {
        ForkOutcome::Accepted { unsent } => {
            Reaction::broadcast(unsent.into_iter().map(Message::NewTransaction).collect())
        }
        ForkOutcome::Rejected { reason, unsent } => {
            log::warn!(
                "candidate chain not adopted: {} ({} unsent computed)",
                reason,
                unsent.len()
            );
            Reaction::default()
        }
    }
}
