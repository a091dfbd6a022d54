//! Math types for SoundMap
//!
//! Propagation happens in the horizontal XZ plane with +Y as the up axis.
//! Angles handed to the helpers here are in degrees; a positive angle turns
//! a vector clockwise when the plane is viewed from above.

pub use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Pose at `position` whose forward vector points along `forward`
    /// projected onto the XZ plane.
    pub fn facing(position: Vec3, forward: Vec3) -> Self {
        let flat = flatten(forward);
        let rotation = if flat == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(-Vec3::Z, flat)
        };
        Self { position, rotation }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * (-Vec3::Z)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Drops the vertical component and normalizes, returning zero for vectors
/// that have no horizontal extent.
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Rotates `v` about +Y by `degrees`. The result is normalized.
pub fn rotate_around_y(degrees: f32, v: Vec3) -> Vec3 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let v = v.normalize_or_zero();
    Vec3::new(cos * v.x - sin * v.z, v.y, sin * v.x + cos * v.z)
}

/// Signed angle in degrees from `from` to `to` about +Y.
///
/// Matches [`rotate_around_y`]: `rotate_around_y(-signed_angle_y(a, b), a)`
/// points along `b` when both lie in the XZ plane.
pub fn signed_angle_y(from: Vec3, to: Vec3) -> f32 {
    let (a, b) = (from.normalize_or_zero(), to.normalize_or_zero());
    if a == Vec3::ZERO || b == Vec3::ZERO {
        return 0.0;
    }
    let unsigned = a.dot(b).clamp(-1.0, 1.0).acos().to_degrees();
    if a.cross(b).y > 0.0 {
        unsigned
    } else {
        -unsigned
    }
}

/// Mirror reflection of `direction` about the surface `normal`.
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    let n = normal.normalize_or_zero();
    direction - 2.0 * direction.dot(n) * n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let rotated = rotate_around_y(90.0, Vec3::X);
        assert!(approx(rotated, Vec3::Z), "got {:?}", rotated);

        let back = rotate_around_y(-90.0, rotated);
        assert!(approx(back, Vec3::X));
    }

    #[test]
    fn test_signed_angle_inverts_rotation() {
        let from = Vec3::new(1.0, 0.0, 0.0);
        for angle in [-135.0_f32, -30.0, 10.0, 75.0, 170.0] {
            let to = rotate_around_y(angle, from);
            let measured = signed_angle_y(from, to);
            assert!(
                approx(rotate_around_y(-measured, from), to),
                "angle {} measured {}",
                angle,
                measured
            );
            assert!((measured.abs() - angle.abs()).abs() < 1e-2);
        }
    }

    #[test]
    fn test_reflect_off_wall() {
        let incoming = Vec3::new(1.0, 0.0, 1.0).normalize();
        let reflected = reflect(incoming, Vec3::new(-1.0, 0.0, 0.0));
        assert!(approx(reflected, Vec3::new(-1.0, 0.0, 1.0).normalize()));
    }

    #[test]
    fn test_facing_pose_forward() {
        let pose = Pose::facing(Vec3::ZERO, Vec3::new(3.0, 2.0, 0.0));
        assert!(approx(pose.forward(), Vec3::X));
    }
}
