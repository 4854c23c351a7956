//! 关节状态来源与关节目标合并

use scribe_protocol::{Header, JointGoal, JointState, Stamp};
use std::sync::Arc;
use tracing::warn;

/// 最新关节状态的来源（例如关节状态订阅的缓存）
pub trait JointStateSource: Send + Sync {
    /// 最近一次收到的关节状态，尚未收到时返回 `None`
    fn latest(&self) -> Option<JointState>;
}

impl<T: JointStateSource + ?Sized> JointStateSource for Arc<T> {
    fn latest(&self) -> Option<JointState> {
        (**self).latest()
    }
}

/// 把部分关节目标合并进当前关节配置
///
/// - 未指定的关节保持当前位置
/// - 当前状态中不存在的关节名被忽略（`warn!`）
/// - 清空力矩，时间戳归零，坐标系设为 `base_frame_id`
pub fn merge_joint_goal(current: &JointState, goal: &JointGoal, base_frame_id: &str) -> JointState {
    let mut target = current.clone();

    for (name, position) in goal.iter() {
        match target.index_of(name) {
            Some(i) if i < target.position.len() => target.position[i] = position,
            _ => warn!("Ignoring unknown joint '{}' in joint goal", name),
        }
    }

    target.effort.clear();
    target.header = Header {
        stamp: Stamp::default(),
        frame_id: base_frame_id.to_string(),
    };
    target
}
