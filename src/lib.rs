pub mod config;
pub mod conversion;
pub mod core;
pub mod engine;
pub mod error;
pub mod hal;
pub mod observability;

pub use config::SessionConfig;
pub use core::{Batch, BatchMeta, BatchPair, ChannelInfo, RawFrame};
pub use engine::{DrainReport, Session, SessionState, StopReport};
pub use error::{SessionError, SessionResult};
