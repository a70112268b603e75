//! Agent tools exposed by the memory manager.

mod memory;

use std::sync::Arc;

pub use memory::{
    MemoryForgetTool, MemoryGetTool, MemoryRecallTool, MemorySearchTool, MemoryStoreTool,
    RECALL_TOOL_DEFAULT_LIMIT, SEARCH_TOOL_DEFAULT_MAX,
};

use crate::manager::MemoryManager;
use crate::tool::ToolRegistry;

/// Registry holding the five memory tools bound to `manager`.
pub fn memory_tools(manager: &Arc<MemoryManager>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(MemoryRecallTool::new(manager.clone()));
    registry.register(MemoryStoreTool::new(manager.clone()));
    registry.register(MemoryForgetTool::new(manager.clone()));
    registry.register(MemorySearchTool::new(manager.clone()));
    registry.register(MemoryGetTool::new(manager.clone()));
    registry
}
