//! Resolved worker configuration and the precedence merge.

use std::ffi::{OsStr, OsString};
use std::fmt;

use tracing::{debug, warn};

use super::{DEFAULT_OPENAI_MODEL, EnvMap, OPENAI_API_KEY, OPENAI_MODEL, TELEGRAM_BOT_TOKEN};

/// Defaults for the keys the bootstrapper owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Model forwarded when the caller supplies none (or an invalid one).
    pub openai_model: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            openai_model: DEFAULT_OPENAI_MODEL.to_owned(),
        }
    }
}

/// Fully resolved worker configuration.
///
/// Only [`merge`] builds this value, so `openai_model` always holds a
/// valid identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    telegram_bot_token: Option<String>,
    openai_api_key: Option<String>,
    openai_model: String,
}

impl Configuration {
    /// Telegram bot token, if the caller supplied one.
    #[must_use]
    pub fn telegram_bot_token(&self) -> Option<&str> {
        self.telegram_bot_token.as_deref()
    }

    /// `OpenAI` API key, if the caller supplied one.
    #[must_use]
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref()
    }

    /// Model identifier the worker will observe.
    #[must_use]
    pub fn openai_model(&self) -> &str {
        &self.openai_model
    }

    /// Writes the resolved values into an environment block.
    ///
    /// Unresolved credentials are left untouched, so an absent key stays absent.
    pub fn apply_to(&self, env: &mut EnvMap) {
        if let Some(token) = &self.telegram_bot_token {
            env.insert(TELEGRAM_BOT_TOKEN.into(), token.into());
        }
        if let Some(key) = &self.openai_api_key {
            env.insert(OPENAI_API_KEY.into(), key.into());
        }
        env.insert(OPENAI_MODEL.into(), self.openai_model.clone().into());
    }

    /// Restores the model key if a later step removed or blanked it.
    ///
    /// Returns `true` when the block had to be repaired.
    pub fn ensure_model(&self, env: &mut EnvMap) -> bool {
        let valid = env
            .get(OsStr::new(OPENAI_MODEL))
            .and_then(|value| value.to_str())
            .is_some_and(is_valid_model);

        if !valid {
            warn!(
                "{} missing or invalid after activation, restoring {}",
                OPENAI_MODEL, self.openai_model
            );
            env.insert(OPENAI_MODEL.into(), OsString::from(&self.openai_model));
        }

        !valid
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("telegram_bot_token", &redact(self.telegram_bot_token.as_ref()))
            .field("openai_api_key", &redact(self.openai_api_key.as_ref()))
            .field("openai_model", &self.openai_model)
            .finish()
    }
}

fn redact(value: Option<&String>) -> &'static str {
    if value.is_some() { "<set>" } else { "<unset>" }
}

/// Checks whether a string can be forwarded as a model identifier.
#[must_use]
pub fn is_valid_model(model: &str) -> bool {
    !model.is_empty() && model.trim() == model && !model.chars().any(char::is_control)
}

/// Resolves the configuration from the caller's environment.
///
/// Caller-supplied values win. Only `OPENAI_MODEL` falls back to a default;
/// missing credentials stay unresolved for the worker to report.
#[must_use]
pub fn merge(caller_env: &EnvMap, defaults: &Defaults) -> Configuration {
    let openai_model = match caller_env.get(OsStr::new(OPENAI_MODEL)).map(|v| v.to_str()) {
        Some(Some(model)) if is_valid_model(model) => model.to_owned(),
        Some(Some(model)) if model.trim().is_empty() => {
            debug!("{} is blank, using default {}", OPENAI_MODEL, defaults.openai_model);
            defaults.openai_model.clone()
        }
        Some(_) => {
            warn!(
                "Ignoring invalid {} value, using default {}",
                OPENAI_MODEL, defaults.openai_model
            );
            defaults.openai_model.clone()
        }
        None => {
            debug!("{} not set, using default {}", OPENAI_MODEL, defaults.openai_model);
            defaults.openai_model.clone()
        }
    };

    Configuration {
        telegram_bot_token: lookup(caller_env, TELEGRAM_BOT_TOKEN),
        openai_api_key: lookup(caller_env, OPENAI_API_KEY),
        openai_model,
    }
}

fn lookup(env: &EnvMap, key: &str) -> Option<String> {
    env.get(OsStr::new(key))
        .and_then(|value| value.to_str())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    #[test]
    fn test_default_model_when_unset() {
        let config = merge(&EnvMap::new(), &Defaults::default());
        assert_eq!(config.openai_model(), DEFAULT_OPENAI_MODEL);
        assert!(config.telegram_bot_token().is_none());
        assert!(config.openai_api_key().is_none());
    }

    #[test]
    fn test_caller_model_wins() {
        let env = env_of(&[(OPENAI_MODEL, "custom-model")]);
        let config = merge(&env, &Defaults::default());
        assert_eq!(config.openai_model(), "custom-model");
    }

    #[test]
    fn test_blank_model_falls_back() {
        for blank in ["", "   ", "\t"] {
            let env = env_of(&[(OPENAI_MODEL, blank)]);
            let config = merge(&env, &Defaults::default());
            assert_eq!(config.openai_model(), DEFAULT_OPENAI_MODEL);
        }
    }

    #[test]
    fn test_invalid_model_falls_back() {
        let env = env_of(&[(OPENAI_MODEL, " gpt-4o ")]);
        let config = merge(&env, &Defaults::default());
        assert_eq!(config.openai_model(), DEFAULT_OPENAI_MODEL);

        let env = env_of(&[(OPENAI_MODEL, "gpt\n4o")]);
        let config = merge(&env, &Defaults::default());
        assert_eq!(config.openai_model(), DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_custom_defaults() {
        let defaults = Defaults {
            openai_model: "gpt-4.1".to_owned(),
        };
        let config = merge(&EnvMap::new(), &defaults);
        assert_eq!(config.openai_model(), "gpt-4.1");
    }

    #[test]
    fn test_credentials_passed_through() {
        let env = env_of(&[(TELEGRAM_BOT_TOKEN, "123:abc"), (OPENAI_API_KEY, "sk-test")]);
        let config = merge(&env, &Defaults::default());
        assert_eq!(config.telegram_bot_token(), Some("123:abc"));
        assert_eq!(config.openai_api_key(), Some("sk-test"));
    }

    #[test]
    fn test_apply_leaves_missing_credentials_absent() {
        let config = merge(&EnvMap::new(), &Defaults::default());
        let mut env = env_of(&[("PATH", "/usr/bin")]);
        config.apply_to(&mut env);

        assert_eq!(env.get(OsStr::new(OPENAI_MODEL)).unwrap(), DEFAULT_OPENAI_MODEL);
        assert!(!env.contains_key(OsStr::new(TELEGRAM_BOT_TOKEN)));
        assert!(!env.contains_key(OsStr::new(OPENAI_API_KEY)));
        assert_eq!(env.get(OsStr::new("PATH")).unwrap(), "/usr/bin");
    }

    #[test]
    fn test_apply_overwrites_blank_model() {
        let mut env = env_of(&[(OPENAI_MODEL, "")]);
        let config = merge(&env, &Defaults::default());
        config.apply_to(&mut env);
        assert_eq!(env.get(OsStr::new(OPENAI_MODEL)).unwrap(), DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_ensure_model_repairs_removed_key() {
        let config = merge(&env_of(&[(OPENAI_MODEL, "custom-model")]), &Defaults::default());
        let mut env = EnvMap::new();
        assert!(config.ensure_model(&mut env));
        assert_eq!(env.get(OsStr::new(OPENAI_MODEL)).unwrap(), "custom-model");
    }

    #[test]
    fn test_ensure_model_keeps_valid_value() {
        let config = merge(&EnvMap::new(), &Defaults::default());
        let mut env = env_of(&[(OPENAI_MODEL, "set-by-activation")]);
        assert!(!config.ensure_model(&mut env));
        assert_eq!(env.get(OsStr::new(OPENAI_MODEL)).unwrap(), "set-by-activation");
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let env = env_of(&[(TELEGRAM_BOT_TOKEN, "123:secret"), (OPENAI_API_KEY, "sk-secret")]);
        let rendered = format!("{:?}", merge(&env, &Defaults::default()));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<set>"));
        assert!(rendered.contains(DEFAULT_OPENAI_MODEL));
    }
}
