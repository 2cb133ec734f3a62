//! Reusable rule implementations.

pub mod cv_terms;

pub use cv_terms::{CvTermRule, StaticTerms, TermSource};
