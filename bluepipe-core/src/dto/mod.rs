//! Data Transfer Objects for the Bluepipe API
//!
//! Request bodies sent to the API and the payloads found inside the `data`
//! field of its response envelope.

pub mod instance;
pub mod job;
pub mod lineage;
