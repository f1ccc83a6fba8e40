//! Gatepass booking engine
//!
//! This library provides the core functionality for the gatepass system:
//! capacity-constrained event booking with asynchronous pass issuance,
//! booking status polling, and check-in scanning at the venue.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
