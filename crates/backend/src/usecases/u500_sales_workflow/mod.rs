pub mod executor;

pub use executor::{run, SalesWorkflow, WorkflowReport};
