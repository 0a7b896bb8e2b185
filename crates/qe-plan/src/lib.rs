//! qe-plan - DSL validator (C3) and query planner (C4)
//!
//! `validate` must run before `plan`; the planner treats every failure as
//! an internal invariant violation rather than a user error (§4.3).

pub mod error;
pub mod planner;
pub mod validator;

pub use error::{PlanError, ValidationError};
pub use planner::plan;
pub use validator::validate;
