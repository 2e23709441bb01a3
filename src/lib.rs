//! Client core for the boat tracker service: live track and AIS vessel state,
//! camera follow policy, map tap resolution and the backend API.

pub mod auth;
pub mod backend;
pub mod camera;
pub mod config;
pub mod errors;
pub mod geo;
pub mod history;
pub mod keychain;
pub mod live;
pub mod models;
pub mod socket;
pub mod tap;
