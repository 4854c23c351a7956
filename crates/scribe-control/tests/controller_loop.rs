//! 控制循环集成测试
//!
//! 控制器在独立任务中运行，测试通过 `ControllerHandle` 与出站通道交互。
//! 使用暂停的时钟，所有等待都是虚拟时间。

mod common;

use common::{panda_joint_state, pose, sim_rig};
use crossbeam_channel::Receiver;
use scribe_control::mock::PlanOutcome;
use scribe_control::{ControlError, ControllerConfig};
use scribe_protocol::{JointGoal, JointTrajectoryBundle, MotionRequest};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::watch;

async fn recv_bundle(rx: &Receiver<JointTrajectoryBundle>) -> JointTrajectoryBundle {
    for _ in 0..500 {
        if let Ok(bundle) = rx.try_recv() {
            return bundle;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("No trajectory bundle within 5s");
}

#[tokio::test(start_paused = true)]
async fn test_pose_goal_end_to_end() {
    let rig = sim_rig(ControllerConfig::default());
    let metrics = rig.controller.metrics();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));

    rig.handle.submit_pose_goal(pose(0.4)).await.unwrap();
    rig.handle.submit_pose_goal(pose(0.6)).await.unwrap();

    let bundle = recv_bundle(&rig.outbound.bundles).await;
    assert_eq!(bundle.mode.as_str(), "publish");
    assert!(!bundle.clear);
    assert_eq!(bundle.trajectories.len(), 1);

    // 第二个目标等待执行器完成
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(rig.outbound.bundles.try_recv().is_err());
    assert_eq!(rig.planner.planned_poses(), vec![pose(0.4)]);

    rig.handle.notify_trajectory_status("done").unwrap();
    let bundle = recv_bundle(&rig.outbound.bundles).await;
    assert_eq!(bundle.trajectories.len(), 1);
    assert_eq!(rig.planner.planned_poses(), vec![pose(0.4), pose(0.6)]);

    shutdown_tx.send(true).unwrap();
    let snapshot = task.await.unwrap();
    assert_eq!(snapshot.pose_goals_planned, 2);
    assert_eq!(snapshot.bundles_published, 2);
    assert_eq!(snapshot.plan_failures, 0);
    assert_eq!(metrics.snapshot().bundles_published, 2);
}

#[tokio::test(start_paused = true)]
async fn test_force_telemetry_while_idle() {
    let rig = sim_rig(ControllerConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));

    rig.handle
        .submit_cartesian_path(vec![pose(0.1), pose(0.2), pose(0.3)])
        .await
        .unwrap();
    recv_bundle(&rig.outbound.bundles).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let samples: Vec<_> = rig.outbound.forces.try_iter().collect();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.force_z.is_finite()));
    assert!(samples.last().unwrap().force_control_enabled);

    shutdown_tx.send(true).unwrap();
    let snapshot = task.await.unwrap();
    assert_eq!(snapshot.cartesian_batches_planned, 1);
    assert_eq!(snapshot.cartesian_waypoints_planned, 3);
}

#[tokio::test(start_paused = true)]
async fn test_planning_timeout_drops_request() {
    let config = ControllerConfig {
        planning_timeout_ms: Some(200),
        ..Default::default()
    };
    let rig = sim_rig(config);
    let metrics = rig.controller.metrics();
    rig.planner.set_outcome(PlanOutcome::Hang);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));

    rig.handle.submit_pose_goal(pose(0.4)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(metrics.plan_failures.load(Ordering::Relaxed), 1);
    assert!(rig.outbound.bundles.try_recv().is_err());

    // 回到 WAITING 后新的请求照常处理
    rig.planner.set_outcome(PlanOutcome::Succeed);
    rig.handle.submit_pose_goal(pose(0.5)).await.unwrap();
    recv_bundle(&rig.outbound.bundles).await;

    shutdown_tx.send(true).unwrap();
    let snapshot = task.await.unwrap();
    assert_eq!(snapshot.plan_failures, 1);
    assert_eq!(snapshot.pose_goals_planned, 1);
}

#[tokio::test(start_paused = true)]
async fn test_joint_goal_through_handle() {
    let rig = sim_rig(ControllerConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));

    let goal = JointGoal::new([("panda_joint1", 0.25), ("panda_joint7", -0.5)]).unwrap();
    let err = rig.handle.submit_joint_goal(goal.clone()).await.unwrap_err();
    assert!(matches!(err, ControlError::JointStateUnavailable));

    rig.joints.set(panda_joint_state());
    rig.handle.submit_joint_goal(goal).await.unwrap();
    recv_bundle(&rig.outbound.bundles).await;

    let targets = rig.planner.joint_targets();
    assert_eq!(targets.len(), 1);
    let expected = panda_joint_state();
    assert_eq!(targets[0].position[0], 0.25);
    assert_eq!(targets[0].position[1], expected.position[1]);
    assert_eq!(targets[0].position[6], -0.5);
    assert_eq!(targets[0].header.frame_id, "panda_link0");

    shutdown_tx.send(true).unwrap();
    let snapshot = task.await.unwrap();
    assert_eq!(snapshot.joint_goals_planned, 1);
}

#[tokio::test(start_paused = true)]
async fn test_transform_failures_do_not_stall_loop() {
    let rig = sim_rig(ControllerConfig::default());
    rig.tree.fail_frame("panda_link6");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let samples: Vec<_> = rig.outbound.forces.try_iter().collect();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.force_z == 0.0));

    shutdown_tx.send(true).unwrap();
    let snapshot = task.await.unwrap();
    assert!(snapshot.transform_failures > 0);
    assert!(snapshot.ticks > 10);
}

#[tokio::test(start_paused = true)]
async fn test_real_hardware_calibrates_before_planning() {
    let config = ControllerConfig {
        use_simulated_hardware: false,
        ..Default::default()
    };
    let rig = sim_rig(config);
    let metrics = rig.controller.metrics();

    let mut state = panda_joint_state();
    state.effort = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.11, 0.0];
    rig.joints.set(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));

    // 标定期间提交的请求在标定结束后处理
    rig.handle.submit_pose_goal(pose(0.4)).await.unwrap();
    assert!(rig.planner.planned_poses().is_empty());

    recv_bundle(&rig.outbound.bundles).await;
    assert_eq!(metrics.calibration_samples.load(Ordering::Relaxed), 100);
    assert_eq!(rig.planner.planned_poses(), vec![pose(0.4)]);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_handle() {
    let rig = sim_rig(ControllerConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();
    let snapshot = task.await.unwrap();
    assert!(snapshot.ticks > 0);

    let err = rig.handle.submit_pose_goal(pose(0.4)).await.unwrap_err();
    assert!(matches!(err, ControlError::ChannelClosed));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_joint_goal_does_not_lose_queued_pose_goal() {
    let rig = sim_rig(ControllerConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 两个命令在同一个周期之前被处理
    let pose_ack = rig.handle.submit_pose_goal(pose(0.4));
    let goal = JointGoal::new([("panda_joint1", 0.25)]).unwrap();
    let joint_ack = rig.handle.submit_joint_goal(goal);
    let (pose_result, joint_result) = tokio::join!(pose_ack, joint_ack);
    pose_result.unwrap();
    assert!(matches!(
        joint_result.unwrap_err(),
        ControlError::JointStateUnavailable
    ));

    recv_bundle(&rig.outbound.bundles).await;
    assert_eq!(rig.planner.planned_poses(), vec![pose(0.4)]);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_submit_rejects_unvalidated_request() {
    let rig = sim_rig(ControllerConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(rig.controller.run(shutdown_rx));

    let err = rig
        .handle
        .submit(MotionRequest::CartesianWaypoints(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ControlError::InvalidRequest(_)));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rig.planner.cartesian_batches().is_empty());

    shutdown_tx.send(true).unwrap();
    let snapshot = task.await.unwrap();
    assert_eq!(snapshot.cartesian_batches_planned, 0);
}
