pub mod registry;
pub mod transfer;

pub use registry::ConversionRegistry;
pub use transfer::{Transfer, TransferFn};
