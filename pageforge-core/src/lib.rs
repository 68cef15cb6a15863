#![doc = "pageforge-core: core pipeline library for pageforge."]

//! This crate contains all business logic for turning a build request into a
//! published static site: content generation (with fallback), repository
//! provisioning, commit/push, and result notification.
//! Server glue, environment loading and the concrete GitHub client live in
//! the `pageforge` binary crate.
//!
//! # Usage
//! Add this as a dependency for all pipeline, data-model and contract code.

pub mod config;
pub mod contract;
pub mod generate;
pub mod notify;
pub mod orchestrate;
pub mod provision;
pub mod publish;
pub mod vcs;
