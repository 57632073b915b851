//! Dynamic tool — a named async closure.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use agentloop_core::error::ToolError;
use agentloop_core::tool::Tool;
use futures::FutureExt;
use futures::future::BoxFuture;

type ToolFn = dyn Fn(String) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync;

/// A tool whose behaviour is supplied as a closure at construction time.
///
/// ```ignore
/// let upper = DynamicTool::new("upper", "Uppercase the input", |input| async move {
///     Ok(input.to_uppercase())
/// });
/// ```
#[derive(Clone)]
pub struct DynamicTool {
    name: String,
    description: String,
    return_direct: bool,
    func: Arc<ToolFn>,
}

impl DynamicTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            return_direct: false,
            func: Arc::new(move |input| func(input).boxed()),
        }
    }

    /// Make this tool's observation the final output of the run.
    pub fn with_return_direct(mut self, return_direct: bool) -> Self {
        self.return_direct = return_direct;
        self
    }
}

impl std::fmt::Debug for DynamicTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTool")
            .field("name", &self.name)
            .field("return_direct", &self.return_direct)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for DynamicTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        (self.func)(input.to_string()).await
    }

    fn return_direct(&self) -> bool {
        self.return_direct
    }
}
