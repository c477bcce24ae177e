//! 节点渲染注册表
//!
//! 类型标签到渲染描述的显式映射，带默认回退项，渲染时解析一次

use crate::types::NodeKind;
use std::collections::HashMap;

/// 渲染描述
#[derive(Debug, Clone, PartialEq)]
pub struct RendererDescriptor {
    /// 前端渲染组件名
    pub component: String,
    /// 是否显示交易对选择器
    pub shows_symbol_picker: bool,
}

impl RendererDescriptor {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            shows_symbol_picker: false,
        }
    }
}

/// 节点渲染注册表
pub struct RendererRegistry {
    entries: HashMap<NodeKind, RendererDescriptor>,
    fallback: RendererDescriptor,
}

impl RendererRegistry {
    pub fn new(fallback: RendererDescriptor) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    pub fn register(&mut self, kind: NodeKind, descriptor: RendererDescriptor) {
        self.entries.insert(kind, descriptor);
    }

    /// 解析节点类型对应的渲染描述，未注册类型回退到默认项
    pub fn resolve(&self, kind: &NodeKind) -> &RendererDescriptor {
        self.entries.get(kind).unwrap_or(&self.fallback)
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        let mut registry = Self::new(RendererDescriptor::new("default-node"));
        registry.register(NodeKind::AiAgent, RendererDescriptor::new("agent-node"));
        registry.register(
            NodeKind::Trading,
            RendererDescriptor {
                component: "trading-node".to_string(),
                shows_symbol_picker: true,
            },
        );
        registry
    }
}
