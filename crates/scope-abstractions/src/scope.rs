//! 执行作用域抽象接口

use loader_common::{LifecycleResult, LifecycleState, ScopeInfo};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// 执行作用域 trait
///
/// 为单元创建的隔离执行上下文。作用域内部的对象图不在加载器的职责范围内，
/// 加载器只编排它的生命周期。
pub trait ExecutionScope: Send + Sync + Debug + 'static {
    /// 作用域标识信息
    fn info(&self) -> &ScopeInfo;

    /// 创建该作用域使用的配置引用
    fn config_ref(&self) -> &str;

    /// 当前生命周期状态
    fn state(&self) -> LifecycleState;

    /// 启动作用域
    fn start(&self) -> LifecycleResult<()>;

    /// 停止作用域，未运行时为空操作
    fn stop(&self) -> LifecycleResult<()>;

    /// 关闭作用域并释放资源，重复调用为空操作
    fn close(&self) -> LifecycleResult<()>;

    /// 用于向下转型到具体作用域类型
    fn as_any(&self) -> &dyn Any;

    /// 是否处于运行状态
    fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// 是否已关闭
    fn is_closed(&self) -> bool {
        self.state().is_closed()
    }
}

/// 共享的作用域句柄
pub type SharedScope = Arc<dyn ExecutionScope>;
