use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use smartflow_mcp::{McpClient, McpTool, McpTransportError, ToolFamily, ToolRequest, ToolResponse};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self, request: &ToolRequest) -> Result<ToolResponse, McpTransportError>;
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        McpTool::name(self)
    }

    async fn execute(&self, request: &ToolRequest) -> Result<ToolResponse, McpTransportError> {
        McpTool::execute(self, request).await
    }
}

/// Name → adapter map. Built once at startup and only read afterwards.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registers one adapter per enterprise tool family, all sharing `client`.
    pub fn enterprise(client: Arc<dyn McpClient>) -> Self {
        let mut registry = Self::default();
        for family in ToolFamily::ALL {
            registry.register(McpTool::for_family(family, client.clone()));
        }
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
