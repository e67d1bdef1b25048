//! Show the retrieved context for a query without calling the model

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::retrieval::ContextPipeline;

/// Run the retrieval pipeline and return whatever the model would
/// have been given, sentinel included. Useful for inspecting why a
/// question got the answer it did.
pub async fn run(query: &str) -> Result<String> {
    let config = Config::new();
    let pipeline = ContextPipeline::from_config(&config).await?;

    let context = pipeline.context_for_query(query).await;
    info!(chars = context.len(), "Context retrieved");
    Ok(context)
}
