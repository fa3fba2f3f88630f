use crate::error::ConfigError;
use secrecy::SecretString;

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub github: GithubConfig,
    pub review: ReviewConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct ProvidersConfig {
    pub groq_api_key: Option<SecretString>,
    pub gemini_api_key: Option<SecretString>,
}

#[derive(Clone)]
pub struct GithubConfig {
    pub token: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
}

#[derive(Clone)]
pub struct ReviewConfig {
    /// Largest diff reviewed in a single provider call. Anything bigger is
    /// split into windows of this many characters.
    pub max_diff_chars: usize,
    /// Pause between window reviews, to stay under provider rate limits.
    pub chunk_delay_ms: u64,
    /// Pause before retrying a failed unit on the fallback provider.
    pub fallback_delay_ms: u64,
    pub skip_filenames: Vec<String>,
    pub skip_extensions: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".into()))?,
            },
            providers: ProvidersConfig {
                groq_api_key: std::env::var("GROQ_API_KEY").ok().map(SecretString::from),
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok().map(SecretString::from),
            },
            github: GithubConfig {
                token: std::env::var("GITHUB_TOKEN").ok().map(SecretString::from),
                webhook_secret: std::env::var("GITHUB_WEBHOOK_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .map(SecretString::from),
            },
            review: ReviewConfig {
                max_diff_chars: std::env::var("MAX_DIFF_CHARS")
                    .unwrap_or_else(|_| "12000".to_string())
                    .parse()
                    .unwrap_or(12000),
                chunk_delay_ms: std::env::var("CHUNK_DELAY_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .unwrap_or(1000),
                fallback_delay_ms: std::env::var("FALLBACK_DELAY_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .unwrap_or(1000),
                skip_filenames: default_skip_filenames(),
                skip_extensions: default_skip_extensions(),
            },
        })
    }
}

fn default_skip_filenames() -> Vec<String> {
    [
        "package-lock.json",
        "yarn.lock",
        "poetry.lock",
        "requirements.txt",
        "Pipfile.lock",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_skip_extensions() -> Vec<String> {
    [
        ".lock", ".min.js", ".min.css", ".svg", ".png", ".jpg", ".jpeg", ".gif", ".ico", ".woff",
        ".woff2", ".ttf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            gemini_api_key: None,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            webhook_secret: None,
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_diff_chars: 12000,
            chunk_delay_ms: 1000,
            fallback_delay_ms: 1000,
            skip_filenames: default_skip_filenames(),
            skip_extensions: default_skip_extensions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let server = ServerConfig::default();
        assert_eq!(server.port, 8080);
        assert_eq!(server.host, "0.0.0.0");
    }

    #[test]
    fn test_review_config_default() {
        let review = ReviewConfig::default();
        assert_eq!(review.max_diff_chars, 12000);
        assert_eq!(review.chunk_delay_ms, 1000);
        assert!(review.skip_filenames.contains(&"yarn.lock".to_string()));
        assert!(review.skip_extensions.contains(&".min.js".to_string()));
    }
}
