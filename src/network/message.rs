//! Peer wire messages
//!
//! Peers exchange JSON envelopes `{"code": 0..4, "data": ...}`. The
//! engine works with a tagged enum matched exhaustively; codes exist
//! only at the wire boundary, and an unknown one is a protocol error
//! the transport must be told about, never silently dropped.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A peer message rejected at the wire boundary
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("unknown message code {0}")]
    UnknownCode(u8),
    #[error("missing payload for message code {0}")]
    MissingPayload(u8),
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Messages exchanged with peers
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// code 0: ask a peer for its tail block
    QueryLatest,
    /// code 1: deliver a single block
    LatestBlock(Block),
    /// code 2: ask a peer for its entire chain
    QueryChain,
    /// code 3: deliver an entire chain
    Chain(Vec<Block>),
    /// code 4: deliver a pending transaction
    NewTransaction(Transaction),
}

/// The on-the-wire envelope
#[derive(Serialize, Deserialize)]
struct Envelope {
    code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl Message {
    /// The wire code for this message kind
    pub fn code(&self) -> u8 {
        match self {
            Message::QueryLatest => 0,
            Message::LatestBlock(_) => 1,
            Message::QueryChain => 2,
            Message::Chain(_) => 3,
            Message::NewTransaction(_) => 4,
        }
    }

    /// Get message type name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::QueryLatest => "QueryLatest",
            Message::LatestBlock(_) => "LatestBlock",
            Message::QueryChain => "QueryChain",
            Message::Chain(_) => "Chain",
            Message::NewTransaction(_) => "NewTransaction",
        }
    }

    /// Serialize to the wire envelope
    pub fn to_json(&self) -> String {
        let data = match self {
            Message::QueryLatest | Message::QueryChain => None,
            Message::LatestBlock(block) => {
                Some(serde_json::to_value(block).expect("block serializes"))
            }
            Message::Chain(blocks) => Some(serde_json::to_value(blocks).expect("chain serializes")),
            Message::NewTransaction(tx) => {
                Some(serde_json::to_value(tx).expect("transaction serializes"))
            }
        };
        let envelope = Envelope {
            code: self.code(),
            data,
        };
        serde_json::to_string(&envelope).expect("envelope serializes")
    }

    /// Decode a wire envelope into a typed message
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        let payload = |code: u8| envelope.data.clone().ok_or(ProtocolError::MissingPayload(code));

        match envelope.code {
            0 => Ok(Message::QueryLatest),
            1 => Ok(Message::LatestBlock(serde_json::from_value(payload(1)?)?)),
            2 => Ok(Message::QueryChain),
            3 => Ok(Message::Chain(serde_json::from_value(payload(3)?)?)),
            4 => Ok(Message::NewTransaction(serde_json::from_value(payload(4)?)?)),
            other => Err(ProtocolError::UnknownCode(other)),
        }
    }
}
