pub mod generator;
pub mod repository;
