//! Service layer: data sources and the reconciliation engine

pub mod boxes;
pub mod cache;
pub mod catalog;
pub mod content;
pub mod hub;
pub mod reconcile;
pub mod tags;
