//! Core domain types and logic.

pub mod cost_basis;
pub mod error;
pub mod lot;
pub mod option_event;
pub mod validation;
