pub mod acquisition;
pub mod buffer;
pub mod drain;
pub mod session;
pub mod state;

pub use acquisition::AcquisitionCallback;
pub use buffer::{Drained, SharedSampleBuffer};
pub use drain::{sample_time, DrainCycle, DrainReport};
pub use session::{Session, StopReport};
pub use state::SessionState;
