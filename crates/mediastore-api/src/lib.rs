//! HTTP boundary of the media store: session-checked media endpoints, archive
//! downloads, storage analytics and static serving of local media.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
