//! # API Module
//!
//! HTTP interface for Social Presence.
//!
//! ## Endpoints Overview
//!
//! ### User Status
//! - `POST /api/v1/users/:id/status` - Set status from `{"status": "..."}`
//! - `GET /api/v1/users/:id/status` - Get the user's true status
//! - `GET /api/v1/users/:id/status/public` - Get the status other users see
//! - `POST /api/v1/users/:id/heartbeat` - Keep an online user online
//! - `PUT /api/v1/users/:id/status/{away,offline,invisible,dnd}` - Status shortcuts
//! - `GET /api/v1/users/status?user_ids=a,b` - Bulk read
//!
//! ### System Essentials
//! - `GET /health` - Store reachability
//! - `GET /metrics` - Prometheus metrics, when enabled

pub mod handlers;
pub mod server;


// Re-export commonly used items
pub use server::{create_app, start_server};
