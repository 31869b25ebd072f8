pub mod config;
pub mod db;
pub mod matching;
pub mod monitoring;
pub mod settlement;
