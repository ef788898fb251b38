//! Core data types for the Aegis engine

pub mod ids;
pub mod position;
pub mod reputation;
pub mod risk_state;
