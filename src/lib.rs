//! scoped-console - a scoped command registry and resolver.
//!
//! Commands are declared in [`commands::Module`]s, loaded in the background
//! by a [`commands::DiscoveryLoader`], and executed through a
//! [`console::Console`] using dotted paths such as `fleet.ship Aurora.speed 12.5`.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod demo;
pub mod error;
pub mod logging;
pub mod value;
