// Domain layer - Core graphing types
pub mod color;
pub mod error;
pub mod expression;
pub mod metric;
pub mod operation;
pub mod perf_data;
pub mod recipe;
pub mod template;
pub mod unit;
