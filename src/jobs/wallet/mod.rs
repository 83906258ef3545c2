// src/jobs/wallet/mod.rs

pub mod corporation;
