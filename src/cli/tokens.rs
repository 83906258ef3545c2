// src/cli/tokens.rs — SSO refresh token management

use super::TokenAction;
use crate::db::models::RefreshToken;
use crate::db::Store;
use crate::esi::sso::CURRENT_TOKEN_VERSION;

pub fn run_tokens(store: &Store, action: TokenAction) -> anyhow::Result<()> {
    match action {
        TokenAction::Add {
            character_id,
            refresh_token,
            scopes,
        } => {
            if refresh_token.trim().is_empty() {
                anyhow::bail!("Refresh token must not be empty");
            }
            let token = RefreshToken {
                character_id,
                version: CURRENT_TOKEN_VERSION,
                scopes: RefreshToken::parse_scopes(&scopes.replace(',', " ")),
                access_token: None,
                refresh_token,
                expires_on: None,
            };
            store.upsert_refresh_token(&token)?;
            println!(
                "Token for character {} stored with {} scope(s).",
                character_id,
                token.scopes.len()
            );
        }
        TokenAction::List => {
            let tokens = store.refresh_tokens()?;
            if tokens.is_empty() {
                println!("No tokens stored.");
                return Ok(());
            }
            for token in tokens {
                let corp = store
                    .corporation_id_for(token.character_id)?
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "  {:>10}  v{}  corp {:<10} {} scope(s)",
                    token.character_id,
                    token.version,
                    corp,
                    token.scopes.len()
                );
            }
        }
        TokenAction::Remove { character_id } => {
            if store.remove_refresh_token(character_id)? {
                println!("Token for character {character_id} removed.");
            } else {
                println!("No token stored for character {character_id}.");
            }
        }
    }
    Ok(())
}
