//! Rostering domain models.
//!
//! Staff members and the input data consumed by the model builder.
//!
//! # Domain Mappings
//!
//! | u-roster | Hospital | Contact centre | Security |
//! |----------|----------|----------------|----------|
//! | Staff | Nurse | Agent | Guard |
//! | Band | Grade | Tier | Rank |
//! | Skill | Ward competency | Language queue | Site licence |
//! | Allowed mask | Night/day contract | Shift pattern | Post hours |

mod input;
mod staff;

pub use input::{allowed_hours, InputData};
pub use staff::Staff;
