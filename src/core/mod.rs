//! Core modules for pricescout's collection and publication pipeline.
//!
//! Records and their serialization, the HTTP/HTML/git boundaries, the
//! collection orchestrator, and the publish state machine all live here.

pub mod collect;
pub mod config;
pub mod error;
pub mod html;
pub mod http;
pub mod logging;
pub mod model;
pub mod pacing;
pub mod publish;
pub mod remote;
pub mod snapshot;
pub mod time;
pub mod vcs;
pub mod workspace;
