// simlink_core/src/reset.rs

use crate::engine::SimulationEngine;
use crate::error::ResetIssue;
use crate::resolver;
use crate::types::RobotResetInfo;
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use tracing::{info, warn};

/// Builds the target pose for a reset entry.
///
/// A 3-value rotation is Euler `[roll, pitch, yaw]`, a 4-value rotation is
/// a quaternion `[x, y, z, w]`. Any other length keeps `current` rotation.
/// Returns `Err` if the position is not exactly three values.
pub fn pose_from_reset(
    info: &RobotResetInfo,
    current: &UnitQuaternion<f64>,
) -> Result<(Isometry3<f64>, Option<ResetIssue>), ResetIssue> {
    let [x, y, z] = info.position.as_slice() else {
        return Err(ResetIssue::InvalidPosition {
            robot: info.name.clone(),
            len: info.position.len(),
        });
    };

    let mut note = None;
    let rotation = match info.rotation.as_slice() {
        [roll, pitch, yaw] => UnitQuaternion::from_euler_angles(*roll, *pitch, *yaw),
        [qx, qy, qz, qw] => {
            let q = Quaternion::new(*qw, *qx, *qy, *qz);
            if q.norm() > f64::EPSILON {
                UnitQuaternion::from_quaternion(q)
            } else {
                note = Some(ResetIssue::RotationIgnored {
                    robot: info.name.clone(),
                    len: 4,
                });
                *current
            }
        }
        other => {
            note = Some(ResetIssue::RotationIgnored {
                robot: info.name.clone(),
                len: other.len(),
            });
            *current
        }
    };

    Ok((
        Isometry3::from_parts(Translation3::new(*x, *y, *z), rotation),
        note,
    ))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetReport {
    /// Names of robots that were moved.
    pub reset: Vec<String>,
    pub issues: Vec<ResetIssue>,
}

/// Teleports every named robot to its requested pose. Robots that cannot
/// be found or whose position is malformed are skipped.
pub fn apply_resets(resets: &[RobotResetInfo], engine: &mut dyn SimulationEngine) -> ResetReport {
    let mut report = ResetReport::default();

    for entry in resets {
        let Some(id) = resolver::find_robot(engine, &entry.name) else {
            report.issues.push(ResetIssue::RobotNotFound(entry.name.clone()));
            continue;
        };
        let current = match engine.robot(id) {
            Some(robot) => robot.pose.rotation,
            None => continue,
        };

        let (pose, note) = match pose_from_reset(entry, &current) {
            Ok(result) => result,
            Err(issue) => {
                report.issues.push(issue);
                continue;
            }
        };
        report.issues.extend(note);

        if engine.respawn_robot(id, pose) {
            info!(
                "Reset robot '{}' to [{:.3}, {:.3}, {:.3}]",
                entry.name, pose.translation.vector.x, pose.translation.vector.y, pose.translation.vector.z
            );
            report.reset.push(entry.name.clone());
        } else {
            report.issues.push(ResetIssue::RespawnRejected(entry.name.clone()));
        }
    }

    for issue in &report.issues {
        warn!("[Reset] {}", issue);
    }
    report
}
