//! Catatan expense tracking server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod ai;
pub mod auth;
pub mod categories;
pub mod config;
pub mod db;
pub mod expenses;
pub mod response;
pub mod routes;
pub mod state;
pub mod ws;
