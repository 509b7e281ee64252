//! Bluepipe Core
//!
//! Core types shared by the Bluepipe client library and CLI.
//!
//! This crate contains:
//! - Domain types: job submissions, instance status, lineage records
//! - DTOs: request and response bodies exchanged with the Bluepipe API

pub mod domain;
pub mod dto;
