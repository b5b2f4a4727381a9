//! Core library for the `pacer` CLI.
//!
//! `pacer` drives paced HTTP GET load against a target URL: a shared token
//! bucket sets the request rate, a pool of workers issues requests with
//! randomized query parameters, and a lock-protected aggregator keeps live
//! statistics. [`run::RunController`] exposes the run lifecycle used by both
//! the one-shot CLI and the control API server in [`control`].
pub mod args;
pub mod config;
pub mod control;
pub mod error;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod run;
pub mod shutdown;
pub mod shutdown_handlers;
