//! Azure DevOps provider implementation for azdo-tools.
//!
//! This crate talks to the Work Item Tracking REST API (`_apis/wit`,
//! api-version 7.1) and implements [`azdo_core::WorkItemGateway`].
//! Writes use JSON Patch documents; authentication is HTTP Basic with an
//! empty user name and a personal access token.

mod client;
mod types;

pub use client::AzureDevOpsClient;
pub use types::*;
