//! Text generator trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Completion, GenerateParams};

/// An external text-completion service.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// Complete a single prompt.
    async fn complete(&self, prompt: &str, params: &GenerateParams) -> Result<Completion>;
}
