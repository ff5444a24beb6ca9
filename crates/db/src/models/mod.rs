//! Row types and DTOs.

pub mod source;
