//! 坐标变换查询
//!
//! 变换树本身由外部提供（[`TransformProvider`]）。控制循环通过
//! [`FrameResolver`] 查询：任何失败都不致命，记录日志后返回退化占位变换，
//! 保证一个周期不会因为变换树暂时不可用而卡住。

use crate::metrics::ControllerMetrics;
use crate::rotation::Transform;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use thiserror::Error;
use tracing::info;

/// 变换查询错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// 目标坐标系尚未出现在变换树中
    #[error("Frame '{frame}' does not exist in the transform tree")]
    Lookup { frame: String },

    /// 两个坐标系不在同一棵树上
    #[error("Frames '{target}' and '{source_frame}' are not connected")]
    Connectivity {
        target: String,
        source_frame: String,
    },

    /// 时间戳相差过大，无法外推
    #[error("Extrapolation error: {0}")]
    Extrapolation(String),
}

/// 外部变换树
///
/// `lookup(target, source)` 返回把 `source` 坐标系中的点映射到 `target` 坐标系的变换。
pub trait TransformProvider: Send + Sync {
    fn lookup(&self, target_frame: &str, source_frame: &str) -> Result<Transform, TransformError>;
}

impl<T: TransformProvider + ?Sized> TransformProvider for Arc<T> {
    fn lookup(&self, target_frame: &str, source_frame: &str) -> Result<Transform, TransformError> {
        (**self).lookup(target_frame, source_frame)
    }
}

/// 带失败兜底的变换查询
pub struct FrameResolver<T> {
    provider: T,
    metrics: Arc<ControllerMetrics>,
}

impl<T: TransformProvider> FrameResolver<T> {
    pub fn new(provider: T, metrics: Arc<ControllerMetrics>) -> Self {
        Self { provider, metrics }
    }

    /// 查询变换，失败时返回 [`Transform::PLACEHOLDER`]
    pub fn resolve(&self, target_frame: &str, source_frame: &str) -> Transform {
        match self.provider.lookup(target_frame, source_frame) {
            Ok(transform) => transform,
            Err(e) => {
                self.metrics.transform_failures.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Could not transform {} to {}: {}",
                    source_frame, target_frame, e
                );
                Transform::PLACEHOLDER
            },
        }
    }

    pub fn provider(&self) -> &T {
        &self.provider
    }
}
