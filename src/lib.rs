//! Attendance client library.
//!
//! Captures a face frame and a position fix concurrently, submits both to a
//! verification backend, and classifies the reply. The `attend` binary is a
//! thin command-line front end over these modules.
//!
//! # Modules
//!
//! - `camera`: video device abstraction, frame capture and the snapshot collection
//! - `geo`: one-shot position acquisition with a hard timeout
//! - `api`: submission modes, request building and the HTTP backend
//! - `orchestrator`: the single-flight submission state machine
//! - `outcome`: attempt outcomes and the result interpreter
//! - `identity`: credentials, the session file and token claims
//! - `slot`: attendance slot derivation
//! - `config`: configuration file handling
//! - `error`: error types with user-recoverable hints
//! - `output`: output mode abstraction (robot/human)
#![forbid(unsafe_code)]

pub mod api;
pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod identity;
pub mod image_ops;
pub mod logging;
pub mod orchestrator;
pub mod outcome;
pub mod output;
pub mod slot;
