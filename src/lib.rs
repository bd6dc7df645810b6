// perfgraph - Metric translation, RPN expressions and graph recipe compilation
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
