//! 运动请求
//!
//! 入站请求是一组封闭的带标签变体，构造时即完成校验，
//! 入队之后不可修改。

use crate::{Pose, ProtocolError};

/// 运动规划请求
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionRequest {
    /// 单个末端目标位姿（整臂运动规划）
    PoseGoal(Pose),
    /// 有序路点，由笛卡尔规划器连成一条连续路径
    CartesianWaypoints(Vec<Pose>),
}

impl MotionRequest {
    /// 创建并校验位姿目标请求
    pub fn pose_goal(pose: Pose) -> Result<Self, ProtocolError> {
        let request = MotionRequest::PoseGoal(pose);
        request.validate()?;
        Ok(request)
    }

    /// 创建并校验笛卡尔路点请求
    ///
    /// # Errors
    /// - `ProtocolError::EmptyWaypoints`: 路点列表为空
    /// - `ProtocolError::NonFinite`: 任一路点含 NaN/Inf
    pub fn cartesian_waypoints(waypoints: Vec<Pose>) -> Result<Self, ProtocolError> {
        let request = MotionRequest::CartesianWaypoints(waypoints);
        request.validate()?;
        Ok(request)
    }

    /// 校验请求内容
    ///
    /// 变体可以直接构造或反序列化得到，入队前必须再次校验。
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            MotionRequest::PoseGoal(pose) => check_pose(pose, "pose goal"),
            MotionRequest::CartesianWaypoints(waypoints) => {
                if waypoints.is_empty() {
                    return Err(ProtocolError::EmptyWaypoints);
                }
                for (i, pose) in waypoints.iter().enumerate() {
                    check_pose(pose, &format!("waypoint #{}", i))?;
                }
                Ok(())
            },
        }
    }

    /// 是否为力控请求（笛卡尔路径）
    pub fn uses_force_control(&self) -> bool {
        matches!(self, MotionRequest::CartesianWaypoints(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MotionRequest::PoseGoal(_) => "pose_goal",
            MotionRequest::CartesianWaypoints(_) => "cartesian_waypoints",
        }
    }
}

fn check_pose(pose: &Pose, field: &str) -> Result<(), ProtocolError> {
    if pose.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::NonFinite {
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, Quaternion};

    fn pose(x: f64) -> Pose {
        Pose::new(Point::new(x, 0.0, 0.2), Quaternion::IDENTITY)
    }

    #[test]
    fn test_pose_goal_validation() {
        assert!(MotionRequest::pose_goal(pose(0.4)).is_ok());

        let err = MotionRequest::pose_goal(pose(f64::NAN)).unwrap_err();
        assert!(matches!(err, ProtocolError::NonFinite { .. }));
    }

    #[test]
    fn test_cartesian_rejects_empty_list() {
        assert!(matches!(
            MotionRequest::cartesian_waypoints(vec![]),
            Err(ProtocolError::EmptyWaypoints)
        ));
    }

    #[test]
    fn test_cartesian_reports_bad_waypoint_index() {
        let err = MotionRequest::cartesian_waypoints(vec![pose(0.1), pose(f64::INFINITY)])
            .unwrap_err();
        assert!(err.to_string().contains("waypoint #1"), "{}", err);
    }

    #[test]
    fn test_validate_catches_directly_built_variants() {
        assert!(MotionRequest::PoseGoal(pose(0.3)).validate().is_ok());
        assert!(matches!(
            MotionRequest::CartesianWaypoints(vec![]).validate(),
            Err(ProtocolError::EmptyWaypoints)
        ));
        assert!(matches!(
            MotionRequest::PoseGoal(pose(f64::NAN)).validate(),
            Err(ProtocolError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_force_control_flag_follows_kind() {
        let goal = MotionRequest::pose_goal(pose(0.1)).unwrap();
        let path = MotionRequest::cartesian_waypoints(vec![pose(0.1), pose(0.2)]).unwrap();
        assert!(!goal.uses_force_control());
        assert!(path.uses_force_control());
        assert_eq!(path.kind(), "cartesian_waypoints");
    }
}
