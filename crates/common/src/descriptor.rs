//! 单元描述定义

use crate::errors::ConfigResult;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// 单元描述
///
/// 一条 `name = configReference` 记录，`config_ref` 可能仍包含占位符。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDescriptor {
    /// 单元名称，区分大小写
    pub name: String,
    /// 配置引用，例如作用域定义文件的路径
    pub config_ref: String,
}

impl UnitDescriptor {
    /// 创建新的单元描述
    pub fn new(name: impl Into<String>, config_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_ref: config_ref.into(),
        }
    }
}

/// 单元描述来源 trait
///
/// 按顺序提供单元描述，核心只消费它，不关心具体格式。
pub trait UnitDescriptorSource: Send + Sync + Debug {
    /// 来源位置，用于日志和管理接口
    fn location(&self) -> String;

    /// 来源是否存在
    fn exists(&self) -> bool;

    /// 读取全部单元描述，保持声明顺序
    fn load_descriptors(&self) -> ConfigResult<Vec<UnitDescriptor>>;
}
