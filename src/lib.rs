pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod scheduler;

#[cfg(test)]
pub mod testing;
