pub mod descriptor;
pub mod github;
pub mod handler;
pub mod registry;
pub mod result;

pub use descriptor::{ParameterSchema, PropertySchema, ToolDescriptor};
pub use github::{GitHubUserTool, GITHUB_API_URL};
pub use handler::{ToolDef, ToolHandler};
pub use registry::ToolRegistry;
pub use result::{ToolFailure, ToolResult};
