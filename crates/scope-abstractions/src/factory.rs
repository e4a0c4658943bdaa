//! 作用域工厂抽象接口
//!
//! 根据配置引用和父作用域创建新的隔离作用域

use crate::parent::SharedParent;
use crate::scope::SharedScope;
use loader_common::ConfigResult;
use std::fmt::Debug;
use tracing::debug;

/// 作用域工厂 trait
pub trait ScopeFactory: Send + Sync + Debug {
    /// 创建绑定到父作用域的新作用域
    ///
    /// 配置引用无法解析时返回 [`ConfigError`](loader_common::ConfigError)，
    /// 此时不得留下任何已部分构造的作用域。
    fn create(&self, config_ref: &str, parent: &SharedParent) -> ConfigResult<SharedScope>;

    /// 获取工厂名称
    fn name(&self) -> &str;
}

/// 闭包工厂包装器
pub struct FnScopeFactory<F>
where
    F: Fn(&str, &SharedParent) -> ConfigResult<SharedScope> + Send + Sync + 'static,
{
    name: String,
    factory_fn: F,
}

impl<F> FnScopeFactory<F>
where
    F: Fn(&str, &SharedParent) -> ConfigResult<SharedScope> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, factory_fn: F) -> Self {
        Self {
            name: name.into(),
            factory_fn,
        }
    }
}

impl<F> Debug for FnScopeFactory<F>
where
    F: Fn(&str, &SharedParent) -> ConfigResult<SharedScope> + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnScopeFactory")
            .field("name", &self.name)
            .field("factory_fn", &"<function>")
            .finish()
    }
}

impl<F> ScopeFactory for FnScopeFactory<F>
where
    F: Fn(&str, &SharedParent) -> ConfigResult<SharedScope> + Send + Sync + 'static,
{
    fn create(&self, config_ref: &str, parent: &SharedParent) -> ConfigResult<SharedScope> {
        debug!("工厂 {} 创建作用域: {}", self.name, config_ref);
        (self.factory_fn)(config_ref, parent)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
