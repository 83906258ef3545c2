// src/lib.rs — Library root for eveapi

pub mod api;
pub mod cli;
pub mod db;
pub mod esi;
pub mod infra;
pub mod jobs;
pub mod updater;
