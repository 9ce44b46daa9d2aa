//! 调查编排层 - 规划、步骤执行、工具调用循环与报告编译

pub mod adapters;
pub mod compiler;
pub mod context;
pub mod outlet;
pub mod planner;
pub mod step;
pub mod tool_loop;
pub mod workflow;

pub use context::{ModelGateway, RunContext};
pub use planner::{InvestigationPlan, InvestigationStep};
pub use step::StepResult;
pub use workflow::{RunOrchestrator, RunOutcome, RunPhase, launch};
