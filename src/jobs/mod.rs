// src/jobs/mod.rs — ESI update jobs

pub mod character;
pub mod corporation;
pub mod wallet;

use crate::esi::job::EsiJob;

/// Jobs run for every refresh token, in dependency order: affiliation
/// feeds the corporation id, roles gate the corporation jobs and
/// divisions feed the journal walker.
pub fn token_jobs() -> Vec<Box<dyn EsiJob>> {
    vec![
        Box::new(character::Affiliation),
        Box::new(character::Roles),
        Box::new(corporation::Divisions),
        Box::new(wallet::corporation::Journals),
    ]
}
