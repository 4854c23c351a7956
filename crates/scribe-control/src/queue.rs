//! 规划请求队列
//!
//! 两个无界 FIFO：位姿目标逐个出队规划；笛卡尔路点按提交顺序拼接，
//! 规划时一次性取走整个队列。

use scribe_protocol::{MotionRequest, Pose};
use std::collections::VecDeque;

/// 位姿目标队列与笛卡尔路点队列
#[derive(Debug, Default)]
pub struct RequestQueues {
    pose_goals: VecDeque<Pose>,
    waypoints: VecDeque<Pose>,
    /// 笛卡尔队列中尚未规划的请求数
    cartesian_requests: usize,
}

impl RequestQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队（请求已在构造时校验）
    pub fn push(&mut self, request: MotionRequest) {
        match request {
            MotionRequest::PoseGoal(pose) => self.pose_goals.push_back(pose),
            MotionRequest::CartesianWaypoints(waypoints) => {
                self.waypoints.extend(waypoints);
                self.cartesian_requests += 1;
            },
        }
    }

    /// 取出最早的位姿目标
    pub fn pop_pose_goal(&mut self) -> Option<Pose> {
        self.pose_goals.pop_front()
    }

    /// 取走全部笛卡尔路点，返回 (路点, 请求数)
    ///
    /// 队列为空时返回 `None`。
    pub fn drain_cartesian(&mut self) -> Option<(Vec<Pose>, usize)> {
        if self.waypoints.is_empty() {
            return None;
        }
        let requests = std::mem::take(&mut self.cartesian_requests);
        Some((self.waypoints.drain(..).collect(), requests))
    }

    pub fn pose_goals_pending(&self) -> usize {
        self.pose_goals.len()
    }

    pub fn waypoints_pending(&self) -> usize {
        self.waypoints.len()
    }

    pub fn cartesian_requests_pending(&self) -> usize {
        self.cartesian_requests
    }

    pub fn is_empty(&self) -> bool {
        self.pose_goals.is_empty() && self.waypoints.is_empty()
    }
}
