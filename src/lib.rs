//! Copy liked videos from one YouTube account to another.

pub mod transfer;

pub use transfer::{
    TransferError, TransferSummary, collect_liked_videos, replay_likes, transfer_likes,
};
