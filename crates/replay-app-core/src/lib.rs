// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core application services shared by replay tools: a storage-agnostic
//! config service and the viewer host settings it persists.

pub mod config;
pub mod viewer;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use viewer::ViewerConfig;
