//! 父作用域实现

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use loader_common::{RegistrationError, RegistrationResult, ScopeInfo};
use scope_abstractions::{DuplicatePolicy, ParentScope, SharedScope};
use tracing::{debug, info};

/// 命名单例表形式的父作用域
///
/// 单例表按名称分片加锁，不同名称的注册互不阻塞。
#[derive(Debug)]
pub struct SingletonParentScope {
    info: ScopeInfo,
    singletons: DashMap<String, SharedScope>,
    duplicate_policy: DuplicatePolicy,
}

impl SingletonParentScope {
    /// 创建新的父作用域，默认拒绝重复名称
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ScopeInfo::new(name),
            singletons: DashMap::new(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    /// 创建根父作用域
    pub fn root() -> Self {
        Self::new("root")
    }

    /// 设置单例名称冲突策略
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// 单例名称冲突策略
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// 已注册单例数量
    pub fn len(&self) -> usize {
        self.singletons.len()
    }

    /// 是否没有任何单例
    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty()
    }
}

impl Default for SingletonParentScope {
    fn default() -> Self {
        Self::root()
    }
}

impl ParentScope for SingletonParentScope {
    fn info(&self) -> &ScopeInfo {
        &self.info
    }

    fn register_singleton(&self, name: &str, instance: SharedScope) -> RegistrationResult<()> {
        match self.singletons.entry(name.to_string()) {
            Entry::Occupied(mut occupied) => match self.duplicate_policy {
                DuplicatePolicy::Reject => {
                    debug!("拒绝重复注册单例: {}", name);
                    Err(RegistrationError::DuplicateSingleton {
                        name: name.to_string(),
                    })
                }
                DuplicatePolicy::Replace => {
                    info!("覆盖已注册的单例: {}", name);
                    occupied.insert(instance);
                    Ok(())
                }
            },
            Entry::Vacant(vacant) => {
                debug!("注册单例: {} -> {}", name, instance.info().id);
                vacant.insert(instance);
                Ok(())
            }
        }
    }

    fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    fn get_singleton(&self, name: &str) -> Option<SharedScope> {
        self.singletons.get(name).map(|entry| entry.value().clone())
    }

    fn destroy_singleton(&self, name: &str) -> RegistrationResult<SharedScope> {
        self.singletons
            .remove(name)
            .map(|(_, instance)| {
                debug!("销毁单例: {}", name);
                instance
            })
            .ok_or_else(|| RegistrationError::NotRegistered {
                name: name.to_string(),
            })
    }

    fn singleton_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .singletons
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}
