//! Webhook ingestion for NexusHub.
//!
//! Verifies signed deliveries from Clerk (via Svix) and Mux, normalizes them
//! into [`events::NormalizedEvent`]s, and routes each one to a single action:
//! an asynchronous Lambda invocation for identity and organization changes,
//! or an upsert into the video status table for asset lifecycle changes. The
//! same server issues Mux direct-upload sessions and serves the project API.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod http_server;
pub mod lambda;
pub mod mux;
pub mod projects;
pub mod state;
pub mod store;
pub mod types;
pub mod verification;
pub mod webhooks;
