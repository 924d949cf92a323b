pub mod renderer;
pub mod service;
