pub mod activity;
pub mod board;
pub mod clients;
pub mod config;
pub mod files;
pub mod filter_args;
pub mod kanban;
pub mod kpis;
pub mod notify;
pub mod orders;
pub mod prefs;
pub mod users;
pub mod views;
pub mod workload;
