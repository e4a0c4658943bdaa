//! 基于单元定义文件的子作用域

use crate::factory::UnitDefinition;
use loader_common::{LifecycleError, LifecycleResult, LifecycleState, ScopeInfo};
use parking_lot::RwLock;
use scope_abstractions::{ExecutionScope, ParentScope, SharedParent, SharedScope};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// 由单元定义构造的子作用域
///
/// 通过弱引用链接父作用域：父作用域以单例形式持有子作用域，
/// 子作用域不能反过来延长父作用域的生命周期。
#[derive(Debug)]
pub struct ConfiguredScope {
    info: ScopeInfo,
    config_ref: String,
    definition: UnitDefinition,
    state: RwLock<LifecycleState>,
    parent: Weak<dyn ParentScope>,
}

impl ConfiguredScope {
    /// 创建新的子作用域，初始状态为 `Created`
    pub fn new(
        info: ScopeInfo,
        config_ref: impl Into<String>,
        definition: UnitDefinition,
        parent: &SharedParent,
    ) -> Self {
        Self {
            info,
            config_ref: config_ref.into(),
            definition,
            state: RwLock::new(LifecycleState::Created),
            parent: Arc::downgrade(parent),
        }
    }

    /// 显示名称，未配置时使用作用域名称
    pub fn display_name(&self) -> &str {
        self.definition
            .display_name
            .as_deref()
            .unwrap_or(&self.info.name)
    }

    /// 获取单元属性
    pub fn property(&self, key: &str) -> Option<&str> {
        self.definition.properties.get(key).map(String::as_str)
    }

    /// 全部单元属性
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.definition.properties
    }

    /// 父作用域，父作用域已释放时返回 `None`
    pub fn parent(&self) -> Option<SharedParent> {
        self.parent.upgrade()
    }

    /// 通过父作用域查找共享的命名单例
    pub fn resolve_shared(&self, name: &str) -> Option<SharedScope> {
        self.parent()?.get_singleton(name)
    }

    /// 在写锁内完成检查和变更，已处于目标效果的调用直接返回
    fn transition(&self, target: LifecycleState) -> LifecycleResult<()> {
        let mut state = self.state.write();
        let settled = match target {
            LifecycleState::Running => *state == LifecycleState::Running,
            LifecycleState::Stopped => *state != LifecycleState::Running,
            LifecycleState::Closed => *state == LifecycleState::Closed,
            LifecycleState::Created => false,
        };
        if settled {
            return Ok(());
        }
        if !state.can_transition_to(target) {
            return Err(LifecycleError::InvalidTransition {
                scope: self.info.name.clone(),
                from: *state,
                to: target,
            });
        }

        debug!("作用域 {} 状态变更: {} -> {}", self.info.name, *state, target);
        *state = target;
        Ok(())
    }
}

impl ExecutionScope for ConfiguredScope {
    fn info(&self) -> &ScopeInfo {
        &self.info
    }

    fn config_ref(&self) -> &str {
        &self.config_ref
    }

    fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    fn start(&self) -> LifecycleResult<()> {
        self.transition(LifecycleState::Running)
    }

    fn stop(&self) -> LifecycleResult<()> {
        self.transition(LifecycleState::Stopped)
    }

    fn close(&self) -> LifecycleResult<()> {
        self.transition(LifecycleState::Closed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
