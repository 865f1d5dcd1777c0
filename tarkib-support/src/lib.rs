//! # Tarkib Support
//!
//! Shared utilities for the Tarkib service-resolution framework.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - "Did you mean?" suggestion scoring

pub mod rendering;
