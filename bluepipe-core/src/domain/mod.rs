//! Core domain types
//!
//! This module contains the domain structures used by the client and the CLI.
//! They describe what the Bluepipe API manages (jobs, their running instances,
//! table lineage) independent of how requests are signed or sent.

pub mod instance;
pub mod job;
pub mod lineage;
