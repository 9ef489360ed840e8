//! Shopfront storefront library.
//!
//! Two halves share this crate:
//!
//! - the persistence API server (`config`, `db`, `error`, `routes`, `state`),
//!   run by the `shopfront-storefront` binary
//! - the client-side cart session (`sync`, `identity`, `persistence`,
//!   `api_client`), which keeps a shopper's cart in step with that API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api_client;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod persistence;
pub mod routes;
pub mod state;
pub mod sync;
