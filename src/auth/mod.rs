//! Gemini API credential lookup and storage.
//!
//! Keys are read from the environment first, then from the system keyring.
//! `stitchperfect auth` stores a key in the keyring; `deauth` removes it.

use std::io::{self, Write};

use keyring::Entry;
use thiserror::Error;
use tracing::{debug, warn};

const KEYRING_SERVICE: &str = "stitchperfect";
const KEYRING_USER: &str = "gemini";

/// Environment variables checked for an API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("keyring access failed: {0}")]
    Keyring(#[from] keyring::Error),
    #[error("failed to read API key: {0}")]
    Io(#[from] io::Error),
    #[error("API key cannot be empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment(&'static str),
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub api_key: String,
    pub source: CredentialSource,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve_with(
    lookup_env: impl Fn(&str) -> Option<String>,
    lookup_keyring: Option<&dyn Fn() -> Option<String>>,
) -> Option<ResolvedCredential> {
    for var in API_KEY_ENV_VARS {
        if let Some(api_key) = non_blank(lookup_env(var)) {
            return Some(ResolvedCredential {
                api_key,
                source: CredentialSource::Environment(var),
            });
        }
    }

    let api_key = non_blank(lookup_keyring?())?;
    Some(ResolvedCredential {
        api_key,
        source: CredentialSource::Keyring,
    })
}

fn keyring_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE, KEYRING_USER)
}

fn read_keyring() -> Option<String> {
    match keyring_entry().and_then(|entry| entry.get_password()) {
        Ok(secret) => Some(secret),
        Err(keyring::Error::NoEntry) => None,
        Err(err) => {
            warn!(error = %err, "keyring lookup failed");
            None
        }
    }
}

/// Find an API key, skipping the keyring when `env_only` is set.
pub fn resolve_api_key(env_only: bool) -> Option<ResolvedCredential> {
    let keyring: &dyn Fn() -> Option<String> = &read_keyring;
    let resolved = resolve_with(
        |var| std::env::var(var).ok(),
        (!env_only).then_some(keyring),
    );
    match &resolved {
        Some(credential) => debug!(source = ?credential.source, "API key resolved"),
        None => debug!(env_only, "no API key found"),
    }
    resolved
}

pub fn store_api_key(api_key: &str) -> Result<(), CredentialError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(CredentialError::Empty);
    }
    keyring_entry()?.set_password(api_key)?;
    Ok(())
}

/// Remove the stored key. Returns false when nothing was stored.
pub fn remove_api_key() -> Result<bool, CredentialError> {
    match keyring_entry()?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

pub fn interactive_auth() -> Result<(), CredentialError> {
    println!("Paste your Gemini API key (from https://aistudio.google.com/apikey).");
    print!("API key: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    store_api_key(&input)?;
    println!("✅ API key saved to the system keyring");
    Ok(())
}

pub fn interactive_deauth() -> Result<(), CredentialError> {
    if remove_api_key()? {
        println!("✅ API key removed from the system keyring");
    } else {
        println!("No API key was stored in the system keyring");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn gemini_variable_wins_over_generic_one() {
        let resolved = resolve_with(env(&[("API_KEY", "generic"), ("GEMINI_API_KEY", "gem")]), None)
            .expect("credential");
        assert_eq!(resolved.api_key, "gem");
        assert_eq!(
            resolved.source,
            CredentialSource::Environment("GEMINI_API_KEY")
        );
    }

    #[test]
    fn blank_environment_values_fall_through_to_keyring() {
        let keyring = || Some("  from-keyring  ".to_string());
        let resolved = resolve_with(env(&[("GEMINI_API_KEY", "  ")]), Some(&keyring))
            .expect("credential");
        assert_eq!(resolved.api_key, "from-keyring");
        assert_eq!(resolved.source, CredentialSource::Keyring);
    }

    #[test]
    fn env_only_skips_keyring() {
        let skipped: Option<&dyn Fn() -> Option<String>> = None;
        assert_eq!(resolve_with(env(&[]), skipped), None);
    }

    #[test]
    fn empty_keys_are_not_stored() {
        assert!(matches!(store_api_key(" \n"), Err(CredentialError::Empty)));
    }
}
