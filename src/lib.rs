pub mod compiler;
pub mod config;
pub mod expression;
pub mod pipeline;
pub mod value;
