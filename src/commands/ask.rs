//! Answer a civic question end to end

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::integrations::OpenAIClient;
use crate::retrieval::ContextPipeline;

/// Retrieve context for the question and phrase an answer with the
/// configured model. The question itself is the only input that may
/// hard-error; everything downstream degrades instead.
pub async fn run(question: &str, model: Option<String>) -> Result<String> {
    if question.trim().is_empty() {
        anyhow::bail!("Question is empty");
    }

    let mut config = Config::new();
    if let Some(model) = model {
        config.openai_model = model;
    }

    let pipeline = ContextPipeline::from_config(&config).await?;
    let context = pipeline.context_for_query(question).await;
    info!(chars = context.len(), "Context retrieved");

    let client = OpenAIClient::from_env()?;
    let answer = client.answer_with_context(question, &context, &config).await?;
    Ok(answer)
}
