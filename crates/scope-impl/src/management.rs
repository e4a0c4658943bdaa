//! 内存管理代理实现

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use loader_common::{RegistrationError, RegistrationResult};
use scope_abstractions::{LoaderManagement, ManagementAgent, ManagementHandle, ObjectName};
use std::sync::Arc;
use tracing::{info, warn};

struct ManagedObject {
    handle: ManagementHandle,
    target: Arc<dyn LoaderManagement>,
}

/// 进程内的管理代理
///
/// 以对象名称为键保存可管理单元，同名重复注册会被拒绝。
#[derive(Default)]
pub struct InMemoryManagementAgent {
    objects: DashMap<ObjectName, ManagedObject>,
}

impl std::fmt::Debug for InMemoryManagementAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.objects.iter().map(|e| e.key().to_string()).collect();
        f.debug_struct("InMemoryManagementAgent")
            .field("objects", &names)
            .finish()
    }
}

impl InMemoryManagementAgent {
    /// 创建新的管理代理
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// 已注册对象数量
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// 是否没有任何注册对象
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ManagementAgent for InMemoryManagementAgent {
    fn register(
        &self,
        object_name: ObjectName,
        target: Arc<dyn LoaderManagement>,
    ) -> RegistrationResult<ManagementHandle> {
        match self.objects.entry(object_name.clone()) {
            Entry::Occupied(_) => {
                warn!("管理对象已注册: {}", object_name);
                Err(RegistrationError::ManagementRejected {
                    object_name: object_name.to_string(),
                    message: "对象名称已被占用".to_string(),
                })
            }
            Entry::Vacant(vacant) => {
                let handle = ManagementHandle::new(object_name);
                info!("注册管理对象: {}", handle.object_name);
                vacant.insert(ManagedObject {
                    handle: handle.clone(),
                    target,
                });
                Ok(handle)
            }
        }
    }

    fn unregister(&self, handle: &ManagementHandle) -> RegistrationResult<()> {
        let removed = self
            .objects
            .remove_if(&handle.object_name, |_, object| object.handle.id == handle.id);

        if removed.is_some() {
            info!("注销管理对象: {}", handle.object_name);
            Ok(())
        } else {
            Err(RegistrationError::NotRegistered {
                name: handle.object_name.to_string(),
            })
        }
    }

    fn lookup(&self, object_name: &ObjectName) -> Option<Arc<dyn LoaderManagement>> {
        self.objects
            .get(object_name)
            .map(|object| Arc::clone(&object.target))
    }
}
