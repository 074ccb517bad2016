// simlink_sim/src/simulation/utils/serde_helpers.rs

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Deserializer};

/// `[x, y, z]` -> `Vector3<f64>`
pub fn vec3_from_array<'de, D>(deserializer: D) -> Result<Vector3<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let arr: [f64; 3] = Deserialize::deserialize(deserializer)?;
    Ok(Vector3::new(arr[0], arr[1], arr[2]))
}

/// `[roll, pitch, yaw]` in degrees -> `UnitQuaternion<f64>`
pub fn quat_from_euler_deg<'de, D>(deserializer: D) -> Result<UnitQuaternion<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let arr: [f64; 3] = Deserialize::deserialize(deserializer)?;
    Ok(UnitQuaternion::from_euler_angles(
        arr[0].to_radians(), // Roll
        arr[1].to_radians(), // Pitch
        arr[2].to_radians(), // Yaw
    ))
}
