// Application layer - Translation, parsing, evaluation and template compilation
pub mod evaluator;
pub mod graph_service;
pub mod metric_catalogue;
pub mod parser;
pub mod template_compiler;
pub mod translator;
