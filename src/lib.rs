//! Sales forecast predict server library.
//!
//! Exposes the modules so integration tests can assemble the same
//! application the binary serves.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
