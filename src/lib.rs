//! flagctl: Feature-Flag Adapter Configuration Controller
//!
//! A library for sequencing configure/reconfigure calls against a
//! pluggable feature-flag adapter, merging overlapping reconfiguration
//! requests that arrive while a call is in flight.

pub mod adapter;
pub mod args;
pub mod config;
pub mod controller;
pub mod watch;
