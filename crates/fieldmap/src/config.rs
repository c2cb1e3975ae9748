use crate::prelude::*;

/// Supported AI classification backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Anthropic,
}

impl AiProvider {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "anthropic" => Ok(AiProvider::Anthropic),
            other => Err(eyre!(
                "Unknown AI provider '{}' (expected 'openai' or 'anthropic')",
                other
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "https://api.openai.com/v1",
            AiProvider::Anthropic => "https://api.anthropic.com",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-4o-mini",
            AiProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

/// AI provider configuration, loaded once by the owning command and
/// passed into the classifier by value -- never read from ambient global
/// state.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl AiConfig {
    /// Observed provider latency tops out well under this bound; a call
    /// exceeding it is treated as a batch failure, not a fatal error.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Load configuration from environment variables, with per-provider
    /// defaults for base URL and model.
    pub fn from_env() -> Result<Self> {
        let provider = match std::env::var("FIELDMAP_AI_PROVIDER") {
            Ok(s) => AiProvider::parse(&s)?,
            Err(_) => AiProvider::OpenAi,
        };

        Ok(Self {
            base_url: std::env::var("FIELDMAP_AI_BASE_URL")
                .unwrap_or_else(|_| provider.default_base_url().to_string()),
            model: std::env::var("FIELDMAP_AI_MODEL")
                .unwrap_or_else(|_| provider.default_model().to_string()),
            api_key: std::env::var("FIELDMAP_AI_KEY").ok(),
            timeout_secs: std::env::var("FIELDMAP_AI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Self::DEFAULT_TIMEOUT_SECS),
            provider,
        })
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        if let Some(p) = provider {
            let parsed = AiProvider::parse(&p)?;
            if parsed != self.provider {
                // Defaults follow the provider unless explicitly pinned.
                if self.base_url == self.provider.default_base_url() {
                    self.base_url = parsed.default_base_url().to_string();
                }
                if self.model == self.provider.default_model() {
                    self.model = parsed.default_model().to_string();
                }
                self.provider = parsed;
            }
        }
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if let Some(m) = model {
            self.model = m;
        }
        if let Some(k) = api_key {
            self.api_key = Some(k);
        }
        Ok(self)
    }

    /// Whether enough configuration exists to attempt the AI tier.
    /// Without an API key the pipeline degrades to heuristics only.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AiConfig {
        AiConfig {
            provider: AiProvider::OpenAi,
            base_url: AiProvider::OpenAi.default_base_url().to_string(),
            model: AiProvider::OpenAi.default_model().to_string(),
            api_key: None,
            timeout_secs: AiConfig::DEFAULT_TIMEOUT_SECS,
        }
    }

    #[test]
    fn parse_provider_names() {
        assert_eq!(AiProvider::parse("openai").unwrap(), AiProvider::OpenAi);
        assert_eq!(
            AiProvider::parse(" Anthropic ").unwrap(),
            AiProvider::Anthropic
        );
        assert!(AiProvider::parse("cohere").is_err());
    }

    #[test]
    fn overrides_switch_provider_defaults() {
        let config = base_config()
            .with_overrides(Some("anthropic".into()), None, None, None)
            .unwrap();
        assert_eq!(config.provider, AiProvider::Anthropic);
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.model, "claude-3-5-haiku-latest");
    }

    #[test]
    fn explicit_base_url_survives_provider_switch() {
        let config = base_config()
            .with_overrides(
                Some("anthropic".into()),
                Some("http://localhost:8080".into()),
                None,
                None,
            )
            .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn unconfigured_without_api_key() {
        let mut config = base_config();
        assert!(!config.is_configured());
        config.api_key = Some("sk-test".into());
        assert!(config.is_configured());
    }
}
