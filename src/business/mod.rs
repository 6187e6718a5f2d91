//! Business Module
//! Mission: Businesses owned by BusinessOwner accounts

pub mod api;
pub mod models;
pub mod service;
pub mod store;

pub use models::{Business, CreateBusinessRequest, UpdateBusinessRequest};
pub use service::{BusinessError, BusinessService};
pub use store::{BusinessRepository, SqliteBusinessStore};
