//! 作用域生命周期管理

use serde::{Deserialize, Serialize};
use std::fmt;

/// 作用域生命周期状态
///
/// 合法的转换为 `Created -> Running -> Stopped -> Running ...`，
/// 任意状态都可以转换到 `Closed`，`Closed` 是终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// 已创建，尚未启动
    Created,
    /// 运行中
    Running,
    /// 已停止，可以再次启动
    Stopped,
    /// 已关闭
    Closed,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Created
    }
}

impl LifecycleState {
    /// 是否可以转换到目标状态
    pub fn can_transition_to(self, target: Self) -> bool {
        use LifecycleState::{Closed, Created, Running, Stopped};

        match (self, target) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Created | Stopped, Running) => true,
            (Running, Stopped) => true,
            _ => false,
        }
    }

    /// 是否处于运行状态
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// 是否已关闭
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// 作用域标识信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeInfo {
    pub id: uuid::Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ScopeInfo {
    /// 创建新的作用域信息
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// 创建根作用域信息
    pub fn root() -> Self {
        Self::new("root")
    }

    /// 创建子作用域信息
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", self.name, name.into()))
    }
}
