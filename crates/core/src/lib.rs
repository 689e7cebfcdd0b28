pub mod camera;
pub mod config;
pub mod control;
pub mod detection;
pub mod output;
pub mod pipeline;
pub mod shared;
