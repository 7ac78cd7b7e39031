pub mod executions;
pub mod tools;
pub mod workflows;
