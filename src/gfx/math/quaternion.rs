//! Quaternion helpers on top of `cgmath::Quaternion<f32>`
//!
//! Node rotations are stored twice: as Euler angles in degrees and as a
//! quaternion. [`QuaternionExt`] provides the conversions between the two and
//! the exponentiation-based interpolation used by rotation tracks.

use cgmath::{InnerSpace, Quaternion, Vector3};

/// Norm below which a quaternion is treated as zero.
const NORM_EPSILON: f32 = 1e-6;

/// Extra quaternion operations the scene graph and animation engine rely on.
pub trait QuaternionExt: Sized {
    /// Builds a quaternion from Euler angles given in degrees.
    ///
    /// Half-angle products are composed in the X/Y/Z order, so the result
    /// matches `to_euler_degrees` away from gimbal lock.
    fn from_euler_degrees(euler: Vector3<f32>) -> Self;

    /// Extracts (roll, pitch, yaw) in degrees using atan2/asin.
    ///
    /// The asin input is clamped to [-1, 1]. At |pitch| = 90° roll and yaw are
    /// ambiguous and only their combination is recovered.
    fn to_euler_degrees(&self) -> Vector3<f32>;

    /// Conjugate divided by the norm, `(-v / n, w / n)`.
    fn inverse_scaled(&self) -> Self;

    /// Unit quaternion, or identity when the norm is (nearly) zero.
    fn normalized_or_identity(&self) -> Self;

    /// Raises the quaternion to a real power.
    fn powf(&self, exponent: f32) -> Self;

    /// Interpolates by exponentiating the relative rotation:
    /// `pow(q2 * inverse(q1), t) * q1`.
    fn slerp_pow(q1: Self, q2: Self, t: f32) -> Self;
}

impl QuaternionExt for Quaternion<f32> {
    fn from_euler_degrees(euler: Vector3<f32>) -> Self {
        let hx = euler.x.to_radians() / 2.0;
        let hy = euler.y.to_radians() / 2.0;
        let hz = euler.z.to_radians() / 2.0;

        let (sx, cx) = hx.sin_cos();
        let (sy, cy) = hy.sin_cos();
        let (sz, cz) = hz.sin_cos();

        Quaternion::new(
            cx * cy * cz + sx * sy * sz,
            sx * cy * cz - cx * sy * sz,
            cx * sy * cz + sx * cy * sz,
            cx * cy * sz - sx * sy * cz,
        )
    }

    fn to_euler_degrees(&self) -> Vector3<f32> {
        let (x, y, z, w) = (self.v.x, self.v.y, self.v.z, self.s);
        let ysqr = y * y;

        let t0 = 2.0 * (w * x + y * z);
        let t1 = 1.0 - 2.0 * (x * x + ysqr);
        let roll = t0.atan2(t1);

        let t2 = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
        let pitch = t2.asin();

        let t3 = 2.0 * (w * z + x * y);
        let t4 = 1.0 - 2.0 * (ysqr + z * z);
        let yaw = t3.atan2(t4);

        Vector3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
    }

    fn inverse_scaled(&self) -> Self {
        let n = self.magnitude();
        if n < NORM_EPSILON {
            log::error!("Cannot invert a zero quaternion, using identity");
            return Quaternion::new(1.0, 0.0, 0.0, 0.0);
        }
        Quaternion::from_sv(self.s / n, -self.v / n)
    }

    fn normalized_or_identity(&self) -> Self {
        let n = self.magnitude();
        if n < NORM_EPSILON {
            return Quaternion::new(1.0, 0.0, 0.0, 0.0);
        }
        Quaternion::from_sv(self.s / n, self.v / n)
    }

    fn powf(&self, exponent: f32) -> Self {
        let norm = self.magnitude();
        if norm < NORM_EPSILON {
            return *self;
        }

        let angle = (self.s / norm).clamp(-1.0, 1.0).acos();
        let sin_angle = angle.sin();
        // sin(angle * e) / sin(angle) tends to e as the angle goes to zero
        let vector_scale = if sin_angle.abs() < NORM_EPSILON {
            exponent
        } else {
            (angle * exponent).sin() / sin_angle
        };

        let powered = Quaternion::from_sv((angle * exponent).cos(), self.v / norm * vector_scale);
        powered * norm.powf(exponent)
    }

    fn slerp_pow(q1: Self, q2: Self, t: f32) -> Self {
        (q2 * q1.inverse_scaled()).powf(t) * q1
    }
}
