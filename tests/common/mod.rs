//! Common test utilities for the attendance client.
//!
//! - `fixtures`: frame images, tokens and config files
//! - `env`: an isolated environment for running the `attend` binary
#![allow(dead_code)]

pub mod env;
pub mod fixtures;

use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
