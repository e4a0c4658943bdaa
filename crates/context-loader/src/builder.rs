//! 单元加载器构建器

use crate::loader::ContextLoader;
use loader_common::UnitDescriptorSource;
use loader_config::SubstitutionTable;
use scope_abstractions::{
    ManagementAgent, ObjectName, ScopeFactory, SharedParent, DEFAULT_MANAGEMENT_DOMAIN,
};
use std::sync::Arc;
use tracing::debug;

/// 单元加载器构建器
///
/// 父作用域和作用域工厂是必需的，其余均为可选
pub struct ContextLoaderBuilder {
    /// 共享父作用域
    parent: SharedParent,
    /// 作用域工厂
    factory: Arc<dyn ScopeFactory>,
    /// 单元描述来源
    source: Option<Arc<dyn UnitDescriptorSource>>,
    /// 占位符替换表
    substitutions: SubstitutionTable,
    /// 管理代理
    management: Option<Arc<dyn ManagementAgent>>,
    /// 管理端点名称
    management_name: ObjectName,
}

impl ContextLoaderBuilder {
    /// 创建新的构建器
    pub fn new(parent: SharedParent, factory: Arc<dyn ScopeFactory>) -> Self {
        Self {
            parent,
            factory,
            source: None,
            substitutions: SubstitutionTable::new(),
            management: None,
            management_name: default_management_name(),
        }
    }

    /// 设置单元描述来源
    pub fn with_source(self, source: impl UnitDescriptorSource + 'static) -> Self {
        self.with_shared_source(Arc::new(source))
    }

    /// 设置共享的单元描述来源
    pub fn with_shared_source(mut self, source: Arc<dyn UnitDescriptorSource>) -> Self {
        debug!("单元描述来源: {}", source.location());
        self.source = Some(source);
        self
    }

    /// 设置占位符替换表
    pub fn with_substitutions(mut self, substitutions: SubstitutionTable) -> Self {
        self.substitutions = substitutions;
        self
    }

    /// 设置管理代理
    pub fn with_management(mut self, agent: Arc<dyn ManagementAgent>) -> Self {
        self.management = Some(agent);
        self
    }

    /// 设置管理端点名称
    pub fn with_management_name(mut self, name: ObjectName) -> Self {
        self.management_name = name;
        self
    }

    /// 构建加载器
    pub fn build(self) -> ContextLoader {
        debug!(
            "构建单元加载器: 工厂 {}, 父作用域 {}",
            self.factory.name(),
            self.parent.info().name
        );
        ContextLoader::from_parts(
            self.parent,
            self.factory,
            self.source,
            self.substitutions,
            self.management,
            self.management_name,
        )
    }

    /// 构建共享的加载器，`init` 需要通过 `Arc` 调用
    pub fn build_shared(self) -> Arc<ContextLoader> {
        Arc::new(self.build())
    }
}

/// 默认管理端点名称 `unit-loader:type=ContextLoader`
pub fn default_management_name() -> ObjectName {
    ObjectName::new(DEFAULT_MANAGEMENT_DOMAIN).with_property("type", "ContextLoader")
}
