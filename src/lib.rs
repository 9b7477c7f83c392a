//! Client library for the social-media management backend: a typed REST
//! client plus the state containers behind each admin screen.

pub mod activity;
pub mod api;
pub mod bulk;
pub mod config;
pub mod customers;
pub mod dashboard;
pub mod errors;
pub mod media;
pub mod model;
pub mod notes;
pub mod notify;
pub mod recycle_bin;
pub mod scope;
pub mod services;
pub mod session;
pub mod tasks;

pub use errors::{ApiError, ApiResult};
