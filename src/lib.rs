pub mod api;
pub mod calculator;
pub mod config;
pub mod humanize;
pub mod identity;
pub mod observability;
pub mod regel;
