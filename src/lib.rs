//! tally — a project billing and progress tracking service.
//!
//! Customers commission projects; projects are broken down into priced
//! features, which are broken down into tasks tracked by percentage
//! completion. Payments, subscriptions, and files hang off projects.
//! The [`finance`] module computes cash totals and progress/earnings
//! figures from the stored rows.

pub mod api;
pub mod db;
pub mod finance;
pub mod models;
