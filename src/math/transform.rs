use super::{Point2d, Pose};
use cgmath::{Matrix3, Vector3};

/// A rigid 2D transform stored as a 3x3 affine matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2d {
    matrix: Matrix3<f64>,
    /// The accumulated rotation, used to carry headings through the transform.
    angle: f64,
}

impl Transform2d {
    /// A rotation of `angle` radians about the origin.
    pub fn rotation(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        #[rustfmt::skip]
        let matrix = Matrix3::new(
            c, s, 0.0,
            -s, c, 0.0,
            0.0, 0.0, 1.0,
        );
        Self { matrix, angle }
    }

    /// A translation by `(dx, dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        #[rustfmt::skip]
        let matrix = Matrix3::new(
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            dx, dy, 1.0,
        );
        Self { matrix, angle: 0.0 }
    }

    /// The transform that maps world coordinates into the frame of `pose`,
    /// i.e. a translation by `-pose.pos` followed by a rotation by `-pose.heading`.
    pub fn to_local(pose: &Pose) -> Self {
        Self::translation(-pose.pos.x, -pose.pos.y).then(&Self::rotation(-pose.heading))
    }

    /// The inverse of [Self::to_local].
    pub fn to_world(pose: &Pose) -> Self {
        Self::rotation(pose.heading).then(&Self::translation(pose.pos.x, pose.pos.y))
    }

    /// Returns a transform which applies `self` and then `next`.
    pub fn then(&self, next: &Transform2d) -> Self {
        Self {
            matrix: next.matrix * self.matrix,
            angle: self.angle + next.angle,
        }
    }

    /// Transforms the x and y coordinates of a point.
    pub fn apply(&self, point: Point2d) -> Point2d {
        let v = self.matrix * Vector3::new(point.x, point.y, 1.0);
        Point2d::new(v.x, v.y)
    }

    /// Transforms a pose's position, leaving the altitude and heading untouched.
    pub fn apply_position(&self, pose: &Pose) -> Pose {
        Pose {
            pos: self.apply(pose.pos),
            ..*pose
        }
    }

    /// Transforms a pose's position and rotates its heading by the same angle.
    pub fn apply_pose(&self, pose: &Pose) -> Pose {
        Pose {
            pos: self.apply(pose.pos),
            heading: pose.heading + self.angle,
            z: pose.z,
        }
    }
}
