pub mod batch;
pub mod frame;

pub use batch::{Batch, BatchMeta, BatchPair, ChannelInfo};
pub use frame::RawFrame;
