//! 关节状态与关节目标

use crate::ProtocolError;

/// 时间戳（秒 + 纳秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

/// 消息头
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub stamp: Stamp,
    /// 坐标系名称
    pub frame_id: String,
}

/// 关节状态快照
///
/// `name`、`position`、`velocity`、`effort` 按下标一一对应；
/// `velocity` 与 `effort` 可以为空（例如仿真硬件不上报力矩）。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointState {
    pub header: Header,
    pub name: Vec<String>,
    /// 关节位置（弧度）
    pub position: Vec<f64>,
    /// 关节速度（rad/s）
    pub velocity: Vec<f64>,
    /// 关节力矩（Nm）
    pub effort: Vec<f64>,
}

impl JointState {
    /// 从名称和位置创建（速度、力矩为空）
    pub fn from_positions<I, S>(joints: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (name, position) = joints.into_iter().map(|(n, p)| (n.into(), p)).unzip();
        JointState {
            name,
            position,
            ..Default::default()
        }
    }

    /// 按下标读取关节力矩
    pub fn effort_at(&self, index: usize) -> Option<f64> {
        self.effort.get(index).copied()
    }

    /// 按名称查找关节下标
    pub fn index_of(&self, joint_name: &str) -> Option<usize> {
        self.name.iter().position(|n| n == joint_name)
    }
}

/// 关节目标（部分关节名 → 目标位置）
///
/// 保留输入顺序；构造时校验非空、数值有限、无重复关节名。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<(String, f64)>", into = "Vec<(String, f64)>")
)]
pub struct JointGoal {
    joints: Vec<(String, f64)>,
}

impl JointGoal {
    /// 创建并校验关节目标
    ///
    /// # Errors
    /// - `ProtocolError::EmptyJointGoal`: 未给出任何关节
    /// - `ProtocolError::NonFinite`: 目标位置为 NaN/Inf
    /// - `ProtocolError::DuplicateJoint`: 同一关节出现多次
    pub fn new<I, S>(joints: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let joints: Vec<(String, f64)> = joints.into_iter().map(|(n, p)| (n.into(), p)).collect();

        if joints.is_empty() {
            return Err(ProtocolError::EmptyJointGoal);
        }

        for (i, (name, position)) in joints.iter().enumerate() {
            if !position.is_finite() {
                return Err(ProtocolError::NonFinite {
                    field: format!("joint goal '{}'", name),
                });
            }
            if joints[..i].iter().any(|(other, _)| other == name) {
                return Err(ProtocolError::DuplicateJoint(name.clone()));
            }
        }

        Ok(JointGoal { joints })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.joints.iter().map(|(n, p)| (n.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

impl TryFrom<Vec<(String, f64)>> for JointGoal {
    type Error = ProtocolError;

    fn try_from(joints: Vec<(String, f64)>) -> Result<Self, Self::Error> {
        JointGoal::new(joints)
    }
}

impl From<JointGoal> for Vec<(String, f64)> {
    fn from(goal: JointGoal) -> Self {
        goal.joints
    }
}
