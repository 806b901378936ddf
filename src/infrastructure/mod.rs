pub mod dylib;
pub mod factory;
pub mod in_memory;
pub mod mock_channel;
