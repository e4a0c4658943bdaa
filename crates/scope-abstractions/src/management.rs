//! 管理端点抽象接口
//!
//! 加载器把自己注册为可管理单元，由外部管理/监控设施调用

use crate::parent::SharedParent;
use crate::scope::SharedScope;
use loader_common::{LoaderResult, RegistrationResult};
use std::fmt;
use std::sync::Arc;

/// 默认管理域
pub const DEFAULT_MANAGEMENT_DOMAIN: &str = "unit-loader";

/// 管理对象名称，形如 `domain:type=ContextLoader`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    domain: String,
    properties: Vec<(String, String)>,
}

impl ObjectName {
    /// 创建新的对象名称
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            properties: Vec::new(),
        }
    }

    /// 添加键属性
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// 管理域
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 获取键属性
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (index, (key, value)) in self.properties.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// 管理注册句柄，注销时使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementHandle {
    pub id: uuid::Uuid,
    pub object_name: ObjectName,
}

impl ManagementHandle {
    /// 创建新的注册句柄
    pub fn new(object_name: ObjectName) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            object_name,
        }
    }
}

/// 加载器管理接口
///
/// 暴露给外部管理设施的操作集合
pub trait LoaderManagement: Send + Sync {
    /// 加载单元
    fn load_unit(&self, name: &str, config_ref: &str) -> LoaderResult<()>;

    /// 卸载单元，从不失败
    fn unload_unit(&self, name: &str);

    /// 按名称获取单元作用域
    fn get_scope(&self, name: &str) -> Option<SharedScope>;

    /// 单元描述来源位置
    fn contexts_config(&self) -> Option<String>;

    /// 父作用域
    fn parent_scope(&self) -> SharedParent;

    /// 已加载的单元名称
    fn loaded_units(&self) -> Vec<String>;
}

/// 管理代理 trait
///
/// 负责为可管理单元命名和注册，加载器只持有这个能力
pub trait ManagementAgent: Send + Sync + fmt::Debug {
    /// 注册管理对象
    fn register(
        &self,
        object_name: ObjectName,
        target: Arc<dyn LoaderManagement>,
    ) -> RegistrationResult<ManagementHandle>;

    /// 注销管理对象
    fn unregister(&self, handle: &ManagementHandle) -> RegistrationResult<()>;

    /// 查找管理对象
    fn lookup(&self, object_name: &ObjectName) -> Option<Arc<dyn LoaderManagement>>;
}
