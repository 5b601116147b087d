//! Agent-facing image tools.

pub mod stable_diffusion;
pub mod toolbox;
pub mod types;

pub use stable_diffusion::{
    StableDiffusionTool, StableDiffusionWebUiTool, TOOL_STABLE_DIFFUSION,
    TOOL_STABLE_DIFFUSION_WEBUI,
};
pub use toolbox::{ImageToolbox, ToolExecutor};
pub use types::{Tool, ToolCall, ToolResult};
