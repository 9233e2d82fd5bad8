//! Testing utilities for plugin and host developers
//!
//! This module provides mocks that record how the host drove them.

pub mod mocks;

pub use mocks::{Journal, MockHandle, MockPlugin, RecordingLogSink, StartCall};
