//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and engine evaluation into use-case APIs.
//! - Keep caller layers decoupled from storage details.

pub mod schedule_service;
