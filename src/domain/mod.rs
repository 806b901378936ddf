//! Channel contract, message shapes and the loader port. No I/O lives here.

pub mod abi;
pub mod channel;
pub mod context;
pub mod messages;
pub mod metadata;
pub mod ports;
