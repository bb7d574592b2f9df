use math_assistant_model::ModelRequest;

use super::Error;
use crate::model_client::ModelClient;
use crate::prompt::PromptTemplate;

/// Formats a prompt and returns the model's completion verbatim.
#[derive(Clone)]
pub struct LlmChain {
    model_client: ModelClient,
    prompt: PromptTemplate,
    stop: Vec<String>,
}

impl LlmChain {
    /// Creates a chain over `prompt`.
    #[inline]
    pub fn new(model_client: ModelClient, prompt: PromptTemplate) -> Self {
        Self {
            model_client,
            prompt,
            stop: vec![],
        }
    }

    /// Sets the stop sequences sent with every request.
    #[inline]
    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = stop.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the prompt template.
    #[inline]
    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    /// Runs the chain with named values for the prompt variables.
    pub async fn run(&self, values: &[(&str, &str)]) -> Result<String, Error> {
        let prompt = self.prompt.format(values)?;
        let req = ModelRequest::from_prompt(prompt).with_stop(&self.stop);
        let completion = self.model_client.complete(req, |_| {}).await?;
        Ok(completion.text)
    }

    /// Runs the chain with a single value, for templates with exactly one
    /// variable.
    pub async fn run_single(&self, input: &str) -> Result<String, Error> {
        match self.prompt.input_variables() {
            [name] => self.run(&[(name.as_str(), input)]).await,
            vars => Err(Error::UnknownFormat(format!(
                "expected one prompt variable, found {}",
                vars.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use math_assistant_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    #[tokio::test]
    async fn test_run_single() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::text("1. Two apples plus two apples.\n2. Four."),
        ]);
        let chain = LlmChain::new(
            ModelClient::new(provider.clone()),
            PromptTemplate::new("Question: {question}\nAnswer:").unwrap(),
        );

        let answer = chain.run_single("2 + 2 apples?").await.unwrap();
        assert_eq!(answer, "1. Two apples plus two apples.\n2. Four.");
        assert_eq!(
            provider.requests()[0],
            ModelRequest::from_prompt("Question: 2 + 2 apples?\nAnswer:")
        );
    }

    #[tokio::test]
    async fn test_run_single_needs_one_variable() {
        let chain = LlmChain::new(
            ModelClient::new(TestModelProvider::default()),
            PromptTemplate::new("{a} and {b}").unwrap(),
        );
        assert!(matches!(
            chain.run_single("x").await,
            Err(Error::UnknownFormat(_))
        ));
    }
}
