pub mod evaluation;
pub mod prompts;

pub use evaluation::EvaluationService;
