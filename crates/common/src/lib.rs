//! # Loader Common
//!
//! 单元加载器各个 crate 共享的基础类型。
//!
//! ## 核心内容
//!
//! - [`ConfigError`] / [`RegistrationError`] / [`TeardownError`] - 错误分类
//! - [`LoaderError`] - `load` 返回的统一错误
//! - [`LifecycleState`] - 作用域生命周期状态
//! - [`UnitDescriptor`] / [`UnitDescriptorSource`] - 单元描述及其来源

pub mod descriptor;
pub mod errors;
pub mod lifecycle;

pub use descriptor::*;
pub use errors::*;
pub use lifecycle::*;
