//! AI provider configuration (OpenAI-compatible chat completions endpoint)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key (never the key itself)
    pub api_key_env: String,
    pub temperature: f64,
    /// Bars of OHLCV history pasted into the prompt, newest last
    pub max_prompt_bars: usize,
}

pub struct ProviderDefaults {
    pub endpoint: &'static str,
    pub model: &'static str,
    pub api_key_env: &'static str,
    pub temperature: f64,
    pub max_prompt_bars: usize,
}

pub const PROVIDER: ProviderDefaults = ProviderDefaults {
    endpoint: "https://api.openai.com/v1/chat/completions",
    model: "gpt-4o-mini",
    api_key_env: "SIGNAL_SNIPER_API_KEY",
    temperature: 0.2,
    max_prompt_bars: 150,
};

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: PROVIDER.endpoint.to_string(),
            model: PROVIDER.model.to_string(),
            api_key_env: PROVIDER.api_key_env.to_string(),
            temperature: PROVIDER.temperature,
            max_prompt_bars: PROVIDER.max_prompt_bars,
        }
    }
}
