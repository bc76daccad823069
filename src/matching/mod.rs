//! Subtitle-based episode matching engine: similarity scoring, cost matrix,
//! optimal assignment and the validation gates.

pub mod assignment;
pub mod cost_matrix;
pub mod similarity;
pub mod validation;
