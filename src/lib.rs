//! EasyQueue Backend Library
//!
//! Exposes core modules for use by the server binary and integration tests.

pub mod api;
pub mod auth;
pub mod business;
pub mod config;
pub mod db;
pub mod middleware;
pub mod whatsapp;
