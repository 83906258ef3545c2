// src/esi/job.rs — Contract shared by every ESI-backed update job
//
// A job declares the route it talks to, the SSO scope its token needs and
// the in-game corporation roles the character must hold. `authenticated`
// is checked before `handle` does any work.

use async_trait::async_trait;
use reqwest::Method;

use super::{EsiClient, EsiRequest, EsiResponse};
use crate::db::models::RefreshToken;
use crate::db::Store;
use crate::infra::errors::EveApiError;

/// Role that satisfies every role requirement.
pub const DIRECTOR: &str = "Director";

/// Everything a job needs while it runs for one character.
pub struct JobContext<'a> {
    pub esi: &'a EsiClient,
    pub store: &'a Store,
    pub token: &'a RefreshToken,
}

impl<'a> JobContext<'a> {
    pub fn new(esi: &'a EsiClient, store: &'a Store, token: &'a RefreshToken) -> Self {
        Self { esi, store, token }
    }

    pub fn character_id(&self) -> i64 {
        self.token.character_id
    }

    /// Corporation of the token's character, as last seen by the affiliation job.
    pub fn corporation_id(&self) -> anyhow::Result<i64> {
        self.store
            .corporation_id_for(self.character_id())?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No affiliation known for character {}",
                    self.character_id()
                )
            })
    }

    pub async fn retrieve(&self, request: &EsiRequest) -> Result<EsiResponse, EveApiError> {
        self.esi.retrieve(request, Some(self.token)).await
    }
}

/// What a job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Not authorised for this token, or nothing to do.
    Skipped(String),
    /// ESI returned the same data as last time.
    Unchanged,
    /// Rows written.
    Completed { records: usize },
}

#[async_trait(?Send)]
pub trait EsiJob {
    fn name(&self) -> &'static str;

    fn method(&self) -> Method {
        Method::GET
    }

    fn endpoint(&self) -> &'static str;

    fn version(&self) -> &'static str;

    /// SSO scope the token must carry; `None` for public routes.
    fn scope(&self) -> Option<&'static str> {
        None
    }

    /// Corporation roles of which the character must hold at least one.
    fn roles(&self) -> &'static [&'static str] {
        &[]
    }

    fn tags(&self) -> &'static [&'static str];

    /// A request for this job's route with no values filled in yet.
    fn request(&self) -> EsiRequest {
        EsiRequest::new(self.method(), self.version(), self.endpoint())
    }

    async fn handle(&mut self, ctx: &JobContext<'_>) -> anyhow::Result<JobOutcome>;
}

/// Whether the token may run `job`: it carries the job's scope and, when
/// roles are required, the character holds one of them or is a Director.
pub fn authenticated(job: &dyn EsiJob, ctx: &JobContext<'_>) -> anyhow::Result<bool> {
    if let Some(scope) = job.scope() {
        if !ctx.token.has_scope(scope) {
            tracing::debug!(
                job = job.name(),
                character_id = ctx.character_id(),
                "{}",
                EveApiError::MissingScope {
                    scope: scope.to_string()
                }
            );
            return Ok(false);
        }
    }

    let required = job.roles();
    if required.is_empty() {
        return Ok(true);
    }

    let held = ctx.store.character_roles(ctx.character_id())?;
    let ok = held
        .iter()
        .filter(|r| r.scope == "corporation")
        .any(|r| r.role == DIRECTOR || required.contains(&r.role.as_str()));

    if !ok {
        tracing::debug!(
            job = job.name(),
            character_id = ctx.character_id(),
            "{}",
            EveApiError::MissingRole {
                roles: required.iter().map(|r| r.to_string()).collect()
            }
        );
    }
    Ok(ok)
}
