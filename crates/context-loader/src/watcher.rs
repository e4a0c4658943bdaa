//! 单元描述文件监控

use crate::loader::ContextLoader;
use loader_common::{ConfigError, ConfigResult};
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 单元描述文件监控器
///
/// 监控描述文件所在目录，文件变化后经过防抖延迟调用 [`ContextLoader::reload`]。
/// 需要在 tokio 运行时中创建，丢弃时停止监控。
pub struct DescriptorWatcher {
    /// 文件系统监控器
    watcher: Option<notify::RecommendedWatcher>,
    /// 重载任务
    task: Option<JoinHandle<()>>,
    /// 被监控的描述文件
    path: PathBuf,
    /// 防抖延迟
    debounce: Duration,
}

impl std::fmt::Debug for DescriptorWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorWatcher")
            .field("path", &self.path)
            .field("debounce", &self.debounce)
            .field("is_watching", &self.is_watching())
            .finish()
    }
}

impl DescriptorWatcher {
    /// 开始监控描述文件
    pub fn start(
        loader: Arc<ContextLoader>,
        path: impl Into<PathBuf>,
        debounce: Duration,
    ) -> ConfigResult<Self> {
        let path = path.into();
        let file_name: Option<OsString> = path.file_name().map(|name| name.to_os_string());
        let (sender, receiver) = mpsc::unbounded_channel::<()>();

        let mut watcher = recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) && event
                    .paths
                    .iter()
                    .any(|changed| changed.file_name() == file_name.as_deref());

                if relevant {
                    debug!("单元描述文件事件: {:?}", event.kind);
                    let _ = sender.send(());
                }
            }
            Err(e) => error!("文件监控错误: {:?}", e),
        })
        .map_err(|e| ConfigError::WatchError {
            message: format!("创建文件监控器失败: {}", e),
        })?;

        // 编辑器常以替换文件的方式保存，因此监控所在目录
        let watch_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchError {
                message: format!("监控目录失败: {}, 原因: {}", watch_dir.display(), e),
            })?;

        let task = tokio::spawn(reload_loop(loader, receiver, debounce));
        info!("开始监控单元描述文件: {}", path.display());

        Ok(Self {
            watcher: Some(watcher),
            task: Some(task),
            path,
            debounce,
        })
    }

    /// 被监控的描述文件
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否正在监控
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// 停止监控
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            info!("停止监控单元描述文件: {}", self.path.display());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for DescriptorWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn reload_loop(
    loader: Arc<ContextLoader>,
    mut receiver: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
) {
    while receiver.recv().await.is_some() {
        tokio::time::sleep(debounce).await;
        while receiver.try_recv().is_ok() {}

        let loader = Arc::clone(&loader);
        match tokio::task::spawn_blocking(move || loader.reload()).await {
            Ok(report) if report.has_changes() || !report.failed.is_empty() => info!(
                "单元描述文件已重载: 新增 {:?}, 卸载 {:?}, 替换 {:?}, 失败 {}",
                report.loaded,
                report.unloaded,
                report.replaced,
                report.failed.len()
            ),
            Ok(_) => debug!("单元描述文件重载完成，无变化"),
            Err(e) => error!("单元重载任务失败: {}", e),
        }
    }
    debug!("单元描述文件监控结束");
}
