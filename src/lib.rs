pub mod catalog;
pub mod cli;
pub mod config;
pub mod context;
pub mod data_types;
pub mod engine;
pub mod generator;
pub mod history;
pub mod repository;
pub mod schema;
pub mod statement;

extern crate lazy_static;

#[cfg(test)]
pub(crate) mod testutils;
