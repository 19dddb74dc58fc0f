//! Test harness for the fitting pipeline.
//!
//! Provides seeded synthetic scans and a fluent builder for scripting
//! pipelines by stage name, plus checks and text reports that explain
//! what a run produced.
//!
//! # Key Components
//!
//! - [`PipelineBuilder`]: named-stage pipeline construction and runs
//! - [`helpers`]: synthetic point-cloud generators and the error type
//! - [`assertions`]: fit checks with diagnostic messages
//! - [`report`]: structured text summaries of a run

pub mod assertions;
pub mod helpers;
pub mod report;
pub mod workflow;

pub use helpers::HarnessError;
pub use report::RunReport;
pub use workflow::PipelineBuilder;
