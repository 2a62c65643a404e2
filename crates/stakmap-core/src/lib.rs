//! Service layer for stakmap: action-plan orchestration, audit recording,
//! and the service error taxonomy.

pub mod action_plan;
pub mod audit;
pub mod error;
