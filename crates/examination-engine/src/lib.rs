pub mod engine;
pub mod rubric;
pub mod runner;
pub mod types;

pub use engine::CrossExaminer;
pub use runner::{parse_verdict, run_test};
pub use types::*;
