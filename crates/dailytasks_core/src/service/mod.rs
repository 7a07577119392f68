//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store and scheduler calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage and host alarm details.

pub mod quick_add;
pub mod task_service;
