// Driver loop, action handlers, loop stack, sub-workflow calls, and router.
//
// `Engine::run` is the only place that advances `current_step_id`; every
// action handler is a pure `(step, envelope, services) -> StepOutcome`
// function with no control-flow authority of its own, except `start_loop`,
// `end_loop`, and `workflow_call`, which the driver special-cases directly
// because they need the loop stack or recursive sub-execution.

pub mod builtin_tools;
pub mod engine;
pub mod error;
mod handlers;
pub mod rerank;
pub mod retry;
pub mod services;

pub use builtin_tools::{CheckKnownOutagesTool, CreateTicketTool};
pub use engine::{Engine, EngineResult};
pub use error::{EngineError, Result};
pub use rerank::LexicalReranker;
pub use retry::RetryPolicy;
pub use services::Services;
