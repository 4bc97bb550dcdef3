//! Stage trait.
//!
//! RULE: Every pipeline component implements PipelineStage.
//! A stage reads its whole input table and returns a freshly built output.
//! It never mutates its input and keeps no state between runs.
//! Execution order is fixed and documented in pipeline.rs.

use crate::error::PipelineResult;

pub trait PipelineStage {
    type Input: ?Sized;
    type Output;

    /// Unique stable name for this stage, used in logs.
    fn name(&self) -> &'static str;

    /// Transform one full table.
    fn run(&self, input: &Self::Input) -> PipelineResult<Self::Output>;
}
