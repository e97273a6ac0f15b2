//! Prompt Pipeline - pure text-template construction for the two LLM calls
//! of a turn, plus extraction of the SQL statement from a model reply.

mod prompt_builder;
mod sql_extract;

pub use prompt_builder::{build_answer_prompt, build_sql_prompt, render_history};
pub use sql_extract::extract_sql;
