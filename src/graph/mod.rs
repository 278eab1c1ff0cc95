//! Microsoft Graph calls made by the application.

pub mod client;
pub mod models;

pub use client::{GraphClient, GraphError};
pub use models::{ApiApplication, Application, ApplicationRegistration, PermissionScope, User};
