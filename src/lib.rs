pub mod api;
pub mod config;
pub mod humanize;
pub mod ledger;
pub mod meters;
pub mod model;
pub mod observability;
pub mod store;
