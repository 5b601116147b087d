use async_trait::async_trait;

use crate::Result;

use super::stable_diffusion::{
    StableDiffusionTool, StableDiffusionWebUiTool, TOOL_STABLE_DIFFUSION,
    TOOL_STABLE_DIFFUSION_WEBUI,
};
use super::types::{Tool, ToolCall, ToolResult};

/// Runs one tool call. Tool-level failures come back as a [`ToolResult`]
/// with `is_error` set; `Err` is reserved for the executor itself breaking.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: ToolCall) -> Result<ToolResult>;
}

/// Routes calls to whichever image tools were registered for the session.
#[derive(Clone, Default)]
pub struct ImageToolbox {
    text: Option<StableDiffusionTool>,
    structured: Option<StableDiffusionWebUiTool>,
}

impl ImageToolbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_tool(mut self, tool: StableDiffusionTool) -> Self {
        self.text = Some(tool);
        self
    }

    pub fn with_structured_tool(mut self, tool: StableDiffusionWebUiTool) -> Self {
        self.structured = Some(tool);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.structured.is_none()
    }

    pub fn tools(&self) -> Vec<Tool> {
        let mut out = Vec::new();
        if self.text.is_some() {
            out.push(StableDiffusionTool::definition());
        }
        if self.structured.is_some() {
            out.push(StableDiffusionWebUiTool::definition());
        }
        out
    }
}

#[async_trait]
impl ToolExecutor for ImageToolbox {
    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        match (call.name.as_str(), &self.text, &self.structured) {
            (TOOL_STABLE_DIFFUSION, Some(tool), _) => tool.execute(call).await,
            (TOOL_STABLE_DIFFUSION_WEBUI, _, Some(tool)) => tool.execute(call).await,
            (other, _, _) => {
                let content = format!("unknown tool: {other}");
                Ok(ToolResult::error(call.id, content))
            }
        }
    }
}
