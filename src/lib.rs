//! The _cmsadmin_ library crate.
//!
//! Administration of pluggable authentication managers and jobs for a
//! certificate management system: a catalog of implementation classes,
//! a registry of plugins and their live instances kept consistent with a
//! hierarchical configuration store, and the admin API on top of it.

pub mod auth;
pub mod cli;
pub mod commons;
pub mod constants;
pub mod daemon;
pub mod jobs;
pub mod plugin;
