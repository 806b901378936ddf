//! Host for runtime-loaded payment channel modules.
//!
//! Modules are opened through a [`domain::ports::ModuleLoader`], registered
//! under a caller-chosen channel id in [`application::registry::PluginRegistry`],
//! and invoked through [`application::dispatch::PaymentDispatcher`].

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
