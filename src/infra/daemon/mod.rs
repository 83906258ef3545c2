// src/infra/daemon/mod.rs

pub mod process;

pub use process::{is_daemon_running, read_pid, remove_pid_file, stop_daemon, write_pid_file};
