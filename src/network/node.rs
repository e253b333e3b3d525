//! The async engine around a shared ledger
//!
//! Single-writer discipline: every mutation of the ledger unit (chain,
//! UTXO set, pool, next-id) happens under one write lock, including the
//! whole validate-then-swap of fork resolution. Mining runs as
//! cancellable background work off the lock: the nonce search polls a
//! watch channel carrying the tip index, and every successful append
//! publishes the new tip before the lock is released, so a competing
//! block is visible to the search by its next difficulty check.
//!
//! Sockets, peer bookkeeping, and message framing belong to the
//! transport collaborator: it feeds raw envelopes in and drains the
//! outbound broadcast channel.

use crate::core::block::Block;
use crate::core::ledger::{Ledger, LedgerError};
use crate::core::transaction::Transaction;
use crate::core::validation::ValidationError;
use crate::mining::miner::Miner;
use crate::network::message::{Message, ProtocolError};
use crate::network::sync;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};

/// Outbound broadcast channel capacity
pub const OUTBOUND_BUFFER: usize = 1000;

/// A node engine driving one ledger
pub struct Node {
    ledger: Arc<RwLock<Ledger>>,
    outbound: mpsc::Sender<Message>,
    tip: watch::Sender<u64>,
}

impl Node {
    /// Wrap a ledger; the returned receiver yields every message the
    /// engine wants broadcast to all peers
    pub fn new(ledger: Ledger) -> (Self, mpsc::Receiver<Message>) {
        let (outbound, receiver) = mpsc::channel(OUTBOUND_BUFFER);
        let (tip, _) = watch::channel(ledger.height());
        (
            Self {
                ledger: Arc::new(RwLock::new(ledger)),
                outbound,
                tip,
            },
            receiver,
        )
    }

    /// Shared handle to the ledger
    pub fn ledger(&self) -> Arc<RwLock<Ledger>> {
        self.ledger.clone()
    }

    pub async fn height(&self) -> u64 {
        self.ledger.read().await.height()
    }

    pub async fn latest_block(&self) -> Block {
        self.ledger.read().await.latest_block().clone()
    }

    /// Decode a raw wire envelope and handle it. Protocol errors are
    /// returned for the transport to report; the message is dropped.
    pub async fn handle_raw(&self, raw: &str) -> Result<Option<Message>, ProtocolError> {
        let message = Message::from_json(raw)?;
        Ok(self.handle_message(message).await)
    }

    /// Run a peer message through the reaction table, returning the
    /// direct reply for the sending peer; broadcasts go out through the
    /// outbound channel.
    pub async fn handle_message(&self, message: Message) -> Option<Message> {
        log::debug!("handling {} from peer", message.type_name());

        let reaction = {
            let mut ledger = self.ledger.write().await;
            let reaction = sync::react(&mut ledger, message);
            self.tip.send_replace(ledger.height());
            reaction
        };

        for broadcast in reaction.broadcast {
            if self.outbound.send(broadcast).await.is_err() {
                log::warn!("outbound channel closed, dropping broadcast");
                break;
            }
        }
        reaction.reply
    }

    /// Validate a locally created transaction, pool it, and broadcast
    /// it to peers
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<(), ValidationError> {
        {
            let mut ledger = self.ledger.write().await;
            ledger.accept_transaction(tx.clone())?;
        }
        let _ = self.outbound.send(Message::NewTransaction(tx)).await;
        Ok(())
    }

    /// Mine one block crediting the given address.
    ///
    /// The template is snapshotted under the write lock, the nonce
    /// search runs on a blocking thread polling the tip channel, and
    /// the commit re-checks the tail under the lock. Append and
    /// broadcast happen as one transition; a search that was aborted or
    /// raced out publishes nothing and returns `None`.
    pub async fn mine(&self, miner_address: &str) -> Result<Option<Block>, LedgerError> {
        let miner = Miner::new(miner_address);

        let template = {
            let mut ledger = self.ledger.write().await;
            miner.prepare(&mut ledger)
        };
        let target = template.index;
        let tip = self.tip.subscribe();

        let sealed = {
            let miner = miner.clone();
            tokio::task::spawn_blocking(move || miner.seal(template, || *tip.borrow() >= target))
                .await
                .expect("mining task panicked")
        };
        let Some(block) = sealed else {
            return Ok(None);
        };

        let committed = {
            let mut ledger = self.ledger.write().await;
            let committed = miner.commit(&mut ledger, block.clone())?;
            if committed {
                self.tip.send_replace(ledger.height());
            }
            committed
        };

        if committed {
            let _ = self.outbound.send(Message::LatestBlock(block.clone())).await;
            Ok(Some(block))
        } else {
            Ok(None)
        }
    }
}
