pub mod ollama;
pub mod openai;

use statline_core::config::{LlmConfig, OllamaConfig};

use crate::provider::{LlmError, LlmProvider};

/// Create the appropriate LLM provider based on config.
pub fn create_provider(
    llm_config: &LlmConfig,
    ollama_config: &OllamaConfig,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    match llm_config.provider.as_str() {
        "openai" => {
            let api_key = llm_config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let base_url = llm_config
                .openai_base_url
                .as_deref()
                .unwrap_or("https://api.openai.com");
            Ok(Box::new(openai::OpenAiProvider::new(
                api_key.clone(),
                llm_config.openai_model.clone(),
                base_url.to_string(),
                llm_config.timeout_secs,
            )?))
        }
        "ollama" => Ok(Box::new(ollama::OllamaProvider::new(
            ollama_config.url.clone(),
            ollama_config.model.clone(),
            llm_config.timeout_secs,
        )?)),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(provider: &str, key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            openai_api_key: key.map(str::to_string),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: None,
            max_tokens: 2048,
            timeout_secs: 30,
        }
    }

    fn ollama() -> OllamaConfig {
        OllamaConfig {
            url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
        }
    }

    #[test]
    fn test_creates_ollama() {
        let provider = create_provider(&llm("ollama", None), &ollama()).unwrap();
        assert_eq!(provider.model(), "llama3.1");
    }

    #[test]
    fn test_openai_requires_key() {
        let err = create_provider(&llm("openai", None), &ollama()).err().unwrap();
        assert!(matches!(err, LlmError::NotConfigured(_)));

        let provider = create_provider(&llm("openai", Some("sk-test")), &ollama()).unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_unknown_provider() {
        let err = create_provider(&llm("gemini", None), &ollama()).err().unwrap();
        assert!(err.to_string().contains("unknown LLM provider: 'gemini'"));
    }
}
