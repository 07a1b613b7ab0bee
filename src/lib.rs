//! Visitplan: Follow-up Visit Scheduling
//!
//! Computes the follow-up visits that should exist for monitored contacts of an outbreak over a
//! date window, reconciles storage to match, and keeps visit assignment balanced across the field
//! teams covering each contact's address.

pub mod batch;
pub mod bulk;
pub mod cli;
pub mod clock;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod generation;
pub mod logging;
pub mod model;
pub mod progress;
pub mod queue;
pub mod store;
pub mod teams;
pub mod types;
