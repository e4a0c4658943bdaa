//! # Scope Abstractions
//!
//! 作用域抽象层，定义单元加载器与外部协作方之间的接口。
//!
//! ## 核心接口
//!
//! - [`ExecutionScope`] - 单元的隔离执行作用域
//! - [`ParentScope`] - 共享父作用域（命名单例表）
//! - [`ScopeFactory`] - 作用域工厂接口
//! - [`ManagementAgent`] / [`LoaderManagement`] - 管理端点接口

pub mod factory;
pub mod management;
pub mod parent;
pub mod scope;

pub use factory::*;
pub use management::*;
pub use parent::*;
pub use scope::*;
