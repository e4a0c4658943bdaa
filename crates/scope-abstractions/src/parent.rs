//! 父作用域抽象接口

use crate::scope::SharedScope;
use loader_common::{RegistrationResult, ScopeInfo};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// 父作用域 trait
///
/// 共享的根上下文，单元以命名单例的形式发布到这里。
/// 单例名称是否允许覆盖由具体实现决定，拒绝时返回
/// [`RegistrationError::DuplicateSingleton`](loader_common::RegistrationError::DuplicateSingleton)。
pub trait ParentScope: Send + Sync + Debug {
    /// 父作用域标识信息
    fn info(&self) -> &ScopeInfo;

    /// 注册命名单例
    fn register_singleton(&self, name: &str, instance: SharedScope) -> RegistrationResult<()>;

    /// 检查命名单例是否已注册
    fn contains_singleton(&self, name: &str) -> bool;

    /// 获取命名单例
    fn get_singleton(&self, name: &str) -> Option<SharedScope>;

    /// 移除命名单例并返回被移除的实例
    fn destroy_singleton(&self, name: &str) -> RegistrationResult<SharedScope>;

    /// 所有已注册的单例名称
    fn singleton_names(&self) -> Vec<String>;
}

/// 共享的父作用域句柄
pub type SharedParent = Arc<dyn ParentScope>;

/// 单例名称冲突策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// 拒绝重复注册
    Reject,
    /// 覆盖已有单例
    Replace,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self::Reject
    }
}
