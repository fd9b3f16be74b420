//! Provider registry — maps provider names to endpoint configurations.

/// How to attach auth credentials to requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// No authentication required (local servers).
    None,
}

/// Configuration for a single provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: &'static str,
    pub base_url: &'static str,
    /// Appended to `base_url`.
    pub chat_path: &'static str,
    /// Environment variable names to try for the API key (in order).
    pub env_keys: &'static [&'static str],
    pub auth_style: AuthStyle,
    /// Environment variable to override the base URL (e.g., OLLAMA_HOST).
    pub base_url_env: Option<&'static str>,
}

/// Every backend here speaks the OpenAI chat-completions dialect.
pub const CHAT_PATH: &str = "/chat/completions";

impl ProviderConfig {
    /// Hosted API keyed by a single env var.
    const fn hosted(name: &'static str, base_url: &'static str, env_keys: &'static [&'static str]) -> Self {
        Self {
            name,
            base_url,
            chat_path: CHAT_PATH,
            env_keys,
            auth_style: AuthStyle::Bearer,
            base_url_env: None,
        }
    }

    /// Local server, no auth; host overridable through `host_env`.
    const fn local(name: &'static str, base_url: &'static str, host_env: &'static str) -> Self {
        Self {
            name,
            base_url,
            chat_path: CHAT_PATH,
            env_keys: &[],
            auth_style: AuthStyle::None,
            base_url_env: Some(host_env),
        }
    }

    const fn with_base_url_env(mut self, env: &'static str) -> Self {
        self.base_url_env = Some(env);
        self
    }
}

static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig::hosted("openai", "https://api.openai.com/v1", &["OPENAI_API_KEY"])
        .with_base_url_env("OPENAI_API_BASE"),
    ProviderConfig::hosted("openrouter", "https://openrouter.ai/api/v1", &["OPENROUTER_API_KEY"]),
    ProviderConfig::hosted("deepseek", "https://api.deepseek.com", &["DEEPSEEK_API_KEY"]),
    ProviderConfig::hosted("siliconflow", "https://api.siliconflow.cn/v1", &["SILICONFLOW_API_KEY"]),
    ProviderConfig::hosted("groq", "https://api.groq.com/openai/v1", &["GROQ_API_KEY"]),
    ProviderConfig::local("ollama", "http://localhost:11434/v1", "OLLAMA_HOST"),
    ProviderConfig::local("llamacpp", "http://localhost:8080/v1", "LLAMACPP_HOST"),
    ProviderConfig::local("vllm", "http://localhost:8000/v1", "VLLM_HOST"),
];

/// Look up a provider config by name.
pub fn get_provider_config(name: &str) -> Option<&'static ProviderConfig> {
    // Also match aliases
    let lookup = match name {
        "llama.cpp" => "llamacpp",
        "silicon" | "siliconcloud" => "siliconflow",
        other => other,
    };
    PROVIDERS.iter().find(|p| p.name == lookup)
}

/// List all known provider names.
pub fn all_provider_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}
