//! Builds the mock channel as a loadable shared library.
//!
//! ```text
//! cargo build -p mock-channel
//! paychan demo --plugin target/debug/libmock_channel.so
//! ```
//!
//! The library carries its own runtime copy without a reactor; every wait in
//! `MockChannel` goes through the host timer on `CallContext`.

use paychan::domain::channel::PluginBox;
use paychan::infrastructure::mock_channel::MockChannel;

fn new_plugin() -> Option<PluginBox> {
    Some(Box::new(MockChannel::new()))
}

paychan::declare_plugin!(new_plugin);
