//! Realty Advisor Suite
//!
//! A backend for real-estate advisors:
//! - Brand, advisor profile and automation settings with change subscriptions
//! - A kanban-style lead pipeline, persisted locally or to the cloud
//! - AI-generated marketing content (market reports, ads, guides, lead
//!   extraction, email-thread analysis) through the Gemini API
//!
//! STATE FLOW:
//! LOAD DEFAULTS-OR-STORED → MUTATE (whole-record replace) → PERSIST → NOTIFY

pub mod api;
pub mod cloud;
pub mod content;
pub mod error;
pub mod gateway;
pub mod leads;
pub mod models;
pub mod settings;
pub mod storage;

pub use error::{GatewayError, Result, SuiteError};

// Re-export common types
pub use models::*;
pub use settings::{SettingsEvent, SettingsStore, SubscriptionId};
