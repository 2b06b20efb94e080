//! HTTP request handlers

pub mod experiments;
pub mod export;
pub mod generate;
pub mod health;

pub use experiments::*;
pub use export::*;
pub use generate::*;
pub use health::*;
