pub mod api;
pub mod artifact;
pub mod cli;
pub mod display;
pub mod error;
pub mod exact;
pub mod machine;
pub mod metrics;
pub mod patterns;
pub mod reel;
pub mod search;
pub mod simulator;
pub mod symbols;
