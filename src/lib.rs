//! Focus tracker core.
//!
//! - [`models`], [`goals`], [`habits`]: records and their state machines
//! - [`mapping`]: UI vocabularies for priority and kanban columns
//! - [`analytics`]: pure aggregation over sessions and tasks
//! - [`task_store`]: optimistic client-side task cache over a [`client::TaskApi`]
//! - [`app`]: the Axum persistence service the store talks to

pub mod analytics;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod goals;
pub mod habits;
pub mod mapping;
pub mod models;
pub mod store;
pub mod task_store;

mod routes_analytics;
mod routes_goals;
mod routes_habits;
mod routes_sessions;
mod routes_tasks;
