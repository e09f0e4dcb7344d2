//! Refinement operator: label, disjunction, role and data refinements

mod data;
mod disjunction;
mod operator;
mod redundancy;

pub use operator::RefinementOperator;
