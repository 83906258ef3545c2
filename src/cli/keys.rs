// src/cli/keys.rs — XML API key management

use super::KeyAction;
use crate::api::KeyPair;
use crate::db::Store;

pub fn run_keys(store: &Store, action: KeyAction) -> anyhow::Result<()> {
    match action {
        KeyAction::Add { key_id, v_code } => {
            let pair = KeyPair::new(key_id, v_code)?;
            store.add_api_key(pair.key_id(), pair.v_code())?;
            println!("Key {} added.", pair.key_id());
        }
        KeyAction::List => {
            let keys = store.list_api_keys()?;
            if keys.is_empty() {
                println!("No keys registered. Add one with `eveapi keys add <key_id> <v_code>`.");
                return Ok(());
            }
            for key in keys {
                let info = store.api_key_info(key.key_id)?;
                let kind = info
                    .as_ref()
                    .map(|i| i.key_type.as_str())
                    .unwrap_or("unknown");
                let state = if key.enabled { "enabled" } else { "disabled" };
                println!("  {:>10}  {:<12} {}", key.key_id, kind, state);
                if let Some(err) = key.last_error {
                    println!("              last error: {err}");
                }
            }
        }
        KeyAction::Remove { key_id } => {
            if store.remove_api_key(key_id)? {
                println!("Key {key_id} removed.");
            } else {
                println!("Key {key_id} not found.");
            }
        }
    }
    Ok(())
}
