//! Core domain utilities shared across modules.

pub mod error;
pub mod string;
