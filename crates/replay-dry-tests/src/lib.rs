// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for replay crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`transport`] - Scripted transport recording requests in call order
//! - [`fixtures`] - Push-event builders

pub mod config;
pub mod fixtures;
pub mod transport;

pub use config::InMemoryConfigStore;
pub use transport::{RecordedRequest, ScriptedTransport};
