use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) =
            std::env::var("CONTEXT_ENGINE_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
            && !key.is_empty()
        {
            self.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("CONTEXT_ENGINE_MODEL")
            && !model.is_empty()
        {
            self.generation_model = model;
        }

        if let Ok(url) = std::env::var("CONTEXT_ENGINE_API_URL")
            && !url.is_empty()
        {
            self.api_url = url;
        }

        if let Ok(corpus) = std::env::var("CONTEXT_ENGINE_CORPUS")
            && !corpus.is_empty()
        {
            self.corpus.path = Some(corpus);
        }

        if let Ok(temp_str) = std::env::var("CONTEXT_ENGINE_TEMPERATURE")
            && let Ok(temp) = temp_str.parse::<f64>()
            && (0.0..=2.0).contains(&temp)
        {
            self.temperature = temp;
        }
    }
}
