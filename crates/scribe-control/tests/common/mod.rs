//! 集成测试公共工具

#![allow(dead_code)]

use scribe_control::mock::{MockPlanner, SharedJointStates, StaticTransformTree};
use scribe_control::{Controller, ControllerConfig, ControllerHandle, OutboundReceivers};
use scribe_protocol::{JointState, Point, Pose, Quaternion};
use std::sync::Arc;

pub type SimController = Controller<MockPlanner, Arc<StaticTransformTree>, Arc<SharedJointStates>>;

/// 模拟环境下的控制器及其协作方
pub struct SimRig {
    pub controller: SimController,
    pub handle: ControllerHandle,
    pub outbound: OutboundReceivers,
    pub planner: MockPlanner,
    pub tree: Arc<StaticTransformTree>,
    pub joints: Arc<SharedJointStates>,
}

pub fn sim_rig(config: ControllerConfig) -> SimRig {
    let planner = MockPlanner::new();
    let tree = Arc::new(StaticTransformTree::panda_default(&config));
    let joints = Arc::new(SharedJointStates::new());
    let (controller, handle, outbound) =
        Controller::new(config, planner.clone(), tree.clone(), joints.clone())
            .expect("default config is valid");
    SimRig {
        controller,
        handle,
        outbound,
        planner,
        tree,
        joints,
    }
}

/// 以 x 坐标区分的位姿
pub fn pose(x: f64) -> Pose {
    Pose::new(Point::new(x, 0.0, 0.3), Quaternion::IDENTITY)
}

pub fn panda_joint_state() -> JointState {
    JointState::from_positions(
        [0.0, -0.785, 0.0, -2.356, 0.0, 1.571, 0.785]
            .into_iter()
            .enumerate()
            .map(|(i, q)| (format!("panda_joint{}", i + 1), q)),
    )
}
