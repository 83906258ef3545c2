// src/jobs/character.rs — Character affiliation and corporation roles

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::db::models::{CharacterAffiliation, CharacterRole};
use crate::esi::job::{authenticated, EsiJob, JobContext, JobOutcome};

/// Resolves the corporation (and alliance) the character belongs to.
pub struct Affiliation;

#[async_trait(?Send)]
impl EsiJob for Affiliation {
    fn name(&self) -> &'static str {
        "character.affiliation"
    }

    fn method(&self) -> Method {
        Method::POST
    }

    fn endpoint(&self) -> &'static str {
        "/characters/affiliation/"
    }

    fn version(&self) -> &'static str {
        "v1"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["character", "affiliation"]
    }

    async fn handle(&mut self, ctx: &JobContext<'_>) -> anyhow::Result<JobOutcome> {
        let request = self
            .request()
            .body(serde_json::json!([ctx.character_id()]));
        let resp = ctx.esi.retrieve(&request, None).await?;
        let affiliations: Vec<CharacterAffiliation> = resp.json()?;

        let mut written = 0;
        for affiliation in affiliations
            .iter()
            .filter(|a| a.character_id == ctx.character_id())
        {
            ctx.store.upsert_affiliation(affiliation)?;
            written += 1;
        }

        Ok(JobOutcome::Completed { records: written })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RolesResponse {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub roles_at_base: Vec<String>,
    #[serde(default)]
    pub roles_at_hq: Vec<String>,
    #[serde(default)]
    pub roles_at_other: Vec<String>,
}

impl RolesResponse {
    pub fn into_roles(self) -> Vec<CharacterRole> {
        let scoped = [
            ("corporation", self.roles),
            ("base", self.roles_at_base),
            ("hq", self.roles_at_hq),
            ("other", self.roles_at_other),
        ];
        scoped
            .into_iter()
            .flat_map(|(scope, roles)| {
                roles.into_iter().map(move |role| CharacterRole {
                    role,
                    scope: scope.to_string(),
                })
            })
            .collect()
    }
}

/// The character's in-game corporation roles.
pub struct Roles;

#[async_trait(?Send)]
impl EsiJob for Roles {
    fn name(&self) -> &'static str {
        "character.roles"
    }

    fn endpoint(&self) -> &'static str {
        "/characters/{character_id}/roles/"
    }

    fn version(&self) -> &'static str {
        "v2"
    }

    fn scope(&self) -> Option<&'static str> {
        Some("esi-characters.read_corporation_roles.v1")
    }

    fn tags(&self) -> &'static [&'static str] {
        &["character", "roles"]
    }

    async fn handle(&mut self, ctx: &JobContext<'_>) -> anyhow::Result<JobOutcome> {
        if !authenticated(self, ctx)? {
            return Ok(JobOutcome::Skipped("missing scope".into()));
        }

        let request = self
            .request()
            .path_value("character_id", ctx.character_id());
        let resp = ctx.retrieve(&request).await?;
        if resp.is_cached_load() {
            return Ok(JobOutcome::Unchanged);
        }

        let roles = resp.json::<RolesResponse>()?.into_roles();
        ctx.store
            .replace_character_roles(ctx.character_id(), &roles)?;

        Ok(JobOutcome::Completed {
            records: roles.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_response_flattens_scopes() {
        let resp: RolesResponse = serde_json::from_str(
            r#"{"roles":["Accountant","Director"],"roles_at_hq":["Station_Manager"]}"#,
        )
        .unwrap();
        let roles = resp.into_roles();
        assert_eq!(roles.len(), 3);
        assert_eq!(roles[0].role, "Accountant");
        assert_eq!(roles[0].scope, "corporation");
        assert_eq!(roles[2].scope, "hq");
    }

    #[test]
    fn test_affiliation_deserializes_without_alliance() {
        let rows: Vec<CharacterAffiliation> = serde_json::from_str(
            r#"[{"character_id":90000001,"corporation_id":98000001}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].corporation_id, 98000001);
        assert_eq!(rows[0].alliance_id, None);
    }
}
