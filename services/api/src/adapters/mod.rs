pub mod db;
pub mod generator_llm;
