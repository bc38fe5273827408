//! 插件运行计数

use std::sync::atomic::{AtomicU64, Ordering};

/// 插件计数器
///
/// 按帧处理结果分别计数，可在其他线程读取快照。
#[derive(Debug, Default)]
pub struct PluginMetrics {
    /// 收到的帧
    pub frames_received: AtomicU64,

    /// 未加载时收到的帧
    pub frames_not_loaded: AtomicU64,

    /// 传感器未激活
    pub frames_inactive: AtomicU64,

    /// 触发激活
    pub activations: AtomicU64,

    /// 没有订阅者
    pub frames_idle: AtomicU64,

    /// 被节流
    pub frames_throttled: AtomicU64,

    /// 窗口越界被拒绝
    pub frames_rejected: AtomicU64,

    /// 已发布读数
    pub readings_published: AtomicU64,
}

impl PluginMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_loaded(&self) {
        self.frames_not_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inactive(&self) {
        self.frames_inactive.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle(&self) {
        self.frames_idle.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_throttled(&self) {
        self.frames_throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.readings_published.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_not_loaded: self.frames_not_loaded.load(Ordering::Relaxed),
            frames_inactive: self.frames_inactive.load(Ordering::Relaxed),
            activations: self.activations.load(Ordering::Relaxed),
            frames_idle: self.frames_idle.load(Ordering::Relaxed),
            frames_throttled: self.frames_throttled.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            readings_published: self.readings_published.load(Ordering::Relaxed),
        }
    }
}

/// 计数快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_not_loaded: u64,
    pub frames_inactive: u64,
    pub activations: u64,
    pub frames_idle: u64,
    pub frames_throttled: u64,
    pub frames_rejected: u64,
    pub readings_published: u64,
}
