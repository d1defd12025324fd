//! Integration tests for drover.
//!
//! `pipeline` drives the registry and runner with in-process actions;
//! `manifest_e2e` goes through the manifest layer with real subprocesses.

mod manifest_e2e;
mod pipeline;
