//! Relational decomposition of nested case documents.
//!
//! Planning runs once per population:
//! [`analyze`] → [`Plan::build`] (table set, column order, reference columns).
//! Decomposition then runs once per document and only reads the plan:
//! [`flatten_case`] → [`reduce_case`], or [`decompose_case`] for both.
//!
//! The plan is immutable and `Send + Sync`, so documents may be decomposed
//! concurrently by the caller.

#![deny(unsafe_code)]

pub mod analyzer;
pub mod error;
pub mod flatten;
pub mod plan;
pub mod population;
pub mod reduce;
mod references;
mod value;

pub use analyzer::{FieldStats, StructureAnalyzer, StructureReport, analyze};
pub use error::{DecomposeError, ErrorKind};
pub use flatten::{FlatRecord, FlattenedCase, flatten_case};
pub use plan::{
    ColumnSource, Placement, Plan, PlanSummary, PlannedColumn, TableLayout, TableSummary,
};
pub use population::{
    DocumentFailure, ErrorPolicy, PopulationTables, decompose_population, plan_population,
};
pub use reduce::{decompose_case, reduce_case};
