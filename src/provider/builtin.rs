//! Built-in provider table
//!
//! The providers a reply is requested from are described in
//! `builtin_providers.toml`, embedded at build time. Candidate indices follow
//! the order of this table, skipping providers without a key.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BuiltinProvider {
    pub id: String,
    pub base_url: String,
    pub model: String,
    /// Name of the credential in `keys.conf`.
    pub key_name: String,
    pub mode: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BuiltinProvidersConfig {
    providers: Vec<BuiltinProvider>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key` plus `anthropic-version`
    Anthropic,
}

impl BuiltinProvider {
    pub fn auth_mode(&self) -> AuthMode {
        match self.mode.as_deref() {
            Some("anthropic") => AuthMode::Anthropic,
            _ => AuthMode::Bearer,
        }
    }
}

pub fn load_builtin_providers() -> Vec<BuiltinProvider> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_providers.toml");

    let config: BuiltinProvidersConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_providers.toml");

    config.providers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_builtin_provider(id: &str) -> Option<BuiltinProvider> {
        load_builtin_providers()
            .into_iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
    }

    #[test]
    fn builtin_table_lists_the_three_providers_in_order() {
        let ids: Vec<String> = load_builtin_providers().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["anthropic", "openai", "mistral"]);
    }

    #[test]
    fn key_names_match_keys_file_entries() {
        let names: Vec<String> = load_builtin_providers()
            .into_iter()
            .map(|p| p.key_name)
            .collect();
        assert_eq!(
            names,
            vec!["ANTHROPIC_API_KEY", "OPENAI_API_KEY", "MISTRAL_API_KEY"]
        );
    }

    #[test]
    fn only_anthropic_uses_its_own_auth() {
        assert_eq!(
            find_builtin_provider("Anthropic").map(|p| p.auth_mode()),
            Some(AuthMode::Anthropic)
        );
        assert_eq!(
            find_builtin_provider("openai").map(|p| p.auth_mode()),
            Some(AuthMode::Bearer)
        );
        assert!(find_builtin_provider("nonexistent").is_none());
    }
}
