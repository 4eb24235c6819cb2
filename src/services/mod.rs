// src/services/mod.rs
pub mod term;
pub mod reconcile;
pub mod guard;
pub mod store;
pub mod finlife;
pub mod parking;
pub mod fetcher;
pub mod pipeline;
pub mod manual;
pub mod curated;
