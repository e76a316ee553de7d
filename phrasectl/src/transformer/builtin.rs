use async_trait::async_trait;
use tracing::instrument;

use super::{ToolFailure, Transformer};
use crate::lexer;

/// Runs the lexer in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTransformer;

#[async_trait]
impl Transformer for BuiltinTransformer {
    fn name(&self) -> &'static str {
        "builtin"
    }

    #[instrument(skip_all, fields(input_len = input.len()))]
    async fn transform(&self, input: &str) -> Result<String, ToolFailure> {
        let source = input.to_owned();
        // Large inputs can take a while; keep them off the async workers
        tokio::task::spawn_blocking(move || lexer::report(&source))
            .await
            .map_err(|e| ToolFailure::Internal(format!("lexer task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_matches_lexer_report() {
        let source = "for i = 0; i >= 10; i++";
        let output = BuiltinTransformer.transform(source).await.unwrap();
        assert_eq!(output, lexer::report(source));
        assert!(output.starts_with("for\t(for , 16)\ni\t(i , 41)\n"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let output = BuiltinTransformer.transform("").await.unwrap();
        assert_eq!(output, lexer::report(""));
    }
}
