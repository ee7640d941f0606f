#![forbid(unsafe_code)]

pub mod distractor;
pub mod error;
pub mod expression;
pub mod generator;
pub mod model;
pub mod names;
pub mod scoring;
pub mod time;

pub use error::Error;
pub use time::Clock;
