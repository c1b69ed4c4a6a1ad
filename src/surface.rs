//! Quadric surface primitives.
//!
//! Every surface exposes a signed scalar `function` whose sign splits space
//! into two half-spaces, an outward `normal`, a forward ray `intersect`, and
//! a `translated` clone. Kinds are a sum type dispatched by match so the
//! tracking hot path never goes through a vtable.

use crate::error::{check_coefficient_count, check_positive, HeliosError, Result};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default tolerance below which `|f(p)|` is treated as "on the surface".
pub const SURFACE_TOLERANCE: f64 = 1e-10;

/// Coefficient magnitude below which the quadratic term is treated as linear.
const QUADRATIC_DEGENERACY: f64 = 1e-12;

/// Coordinate axis selector for the on-axis surface kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

impl Axis {
    /// Component index of this axis.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two component indices perpendicular to this axis, in cyclic order.
    #[inline]
    pub fn others(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (2, 0),
            Axis::Z => (0, 1),
        }
    }

    /// Unit vector along this axis.
    #[inline]
    pub fn unit(self) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        v[self.index()] = 1.0;
        v
    }
}

/// Which side of a surface a point is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// The half-space where `f(p) > 0`.
    Positive,
    /// The half-space where `f(p) < 0`.
    Negative,
}

impl Sense {
    /// Classify a scalar function value.
    #[inline]
    pub fn of(value: f64) -> Sense {
        if value > 0.0 {
            Sense::Positive
        } else {
            Sense::Negative
        }
    }

    /// The opposite sense.
    #[inline]
    pub fn flipped(self) -> Sense {
        match self {
            Sense::Positive => Sense::Negative,
            Sense::Negative => Sense::Positive,
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Positive => write!(f, "+"),
            Sense::Negative => write!(f, "-"),
        }
    }
}

/// Boundary condition carried by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    /// Particles cross freely.
    #[default]
    Transmissive,
    /// Particles leak out of the problem.
    Vacuum,
    /// Particles are specularly reflected.
    Reflective,
}

/// The supported surface kinds with inline coefficient storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Plane perpendicular to a coordinate axis: `p[axis] - offset`.
    AxisPlane {
        /// Axis the plane is perpendicular to.
        axis: Axis,
        /// Signed position of the plane along the axis.
        offset: f64,
    },
    /// General plane: `normal . p - offset`.
    Plane {
        /// Plane normal (need not be unit length).
        normal: Vector3<f64>,
        /// Signed plane offset.
        offset: f64,
    },
    /// Infinite circular cylinder parallel to a coordinate axis.
    AxisCylinder {
        /// Axis the cylinder is parallel to.
        axis: Axis,
        /// Center in the two perpendicular coordinates, in cyclic axis order.
        center: [f64; 2],
        /// Cylinder radius.
        radius: f64,
    },
    /// Sphere: `|p - center|^2 - radius^2`.
    Sphere {
        /// Sphere center.
        center: Vector3<f64>,
        /// Sphere radius.
        radius: f64,
    },
    /// General quadric
    /// `ax^2 + by^2 + cz^2 + 2(dxy + eyz + fzx) + 2(gx + hy + iz) + j`.
    Quadric {
        /// The ten quadric coefficients `[a, b, c, d, e, f, g, h, i, j]`.
        coefficients: [f64; 10],
    },
}

/// A surface with its identifiers and boundary flags.
///
/// The internal `index` is assigned by the geometry module at setup and is
/// the id cells refer to in their sense lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Free-form identifier chosen by the input author.
    pub user_id: String,
    /// Dense internal id assigned at setup.
    pub index: usize,
    /// Boundary condition on this surface.
    pub boundary: BoundaryKind,
    /// The geometric kind and its coefficients.
    pub kind: SurfaceKind,
}

impl Surface {
    /// Create a surface from its external name tag and coefficient vector.
    ///
    /// Recognized tags: `px`, `py`, `pz`, `p`, `c/x`, `c/y`, `c/z`, `so`,
    /// `s`, `sq`. The internal index starts at 0 and is reassigned when the
    /// geometry module interns the surface.
    pub fn from_tag(
        user_id: &str,
        tag: &str,
        coefficients: &[f64],
        boundary: BoundaryKind,
    ) -> Result<Self> {
        let kind = SurfaceKind::from_tag(user_id, tag, coefficients)?;
        Ok(Self {
            user_id: user_id.to_string(),
            index: 0,
            boundary,
            kind,
        })
    }

    /// Signed scalar function of this surface at `point`.
    #[inline]
    pub fn function(&self, point: &Vector3<f64>) -> f64 {
        self.kind.function(point)
    }

    /// Outward gradient at `point`.
    ///
    /// Cylinders and spheres return unit vectors; planes return the stored
    /// normal as-is. Only the direction (sign) is load-bearing for tracking.
    #[inline]
    pub fn normal(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.kind.normal(point)
    }

    /// Sense of `point` with respect to this surface.
    #[inline]
    pub fn sense_of(&self, point: &Vector3<f64>) -> Sense {
        Sense::of(self.function(point))
    }

    /// Forward ray-surface distance with the default surface tolerance.
    ///
    /// `sense` is the particle's current half-space with respect to this
    /// surface. Returns `None` when no forward crossing exists.
    #[inline]
    pub fn intersect(
        &self,
        point: &Vector3<f64>,
        direction: &Vector3<f64>,
        sense: Sense,
    ) -> Option<f64> {
        self.intersect_with_tolerance(point, direction, sense, SURFACE_TOLERANCE)
    }

    /// Forward ray-surface distance with an explicit surface tolerance.
    pub fn intersect_with_tolerance(
        &self,
        point: &Vector3<f64>,
        direction: &Vector3<f64>,
        sense: Sense,
        surface_tol: f64,
    ) -> Option<f64> {
        self.kind
            .intersect(point, direction, sense, surface_tol)
    }

    /// A translated clone sharing user id, index, and boundary flags.
    pub fn translated(&self, shift: &Vector3<f64>) -> Surface {
        Surface {
            user_id: self.user_id.clone(),
            index: self.index,
            boundary: self.boundary,
            kind: self.kind.translated(shift),
        }
    }

    /// The external name tag this surface round-trips through.
    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }
}

impl SurfaceKind {
    /// Parse a kind from its external name tag and coefficient vector.
    pub fn from_tag(user_id: &str, tag: &str, coefficients: &[f64]) -> Result<Self> {
        match tag {
            "px" | "py" | "pz" => {
                check_coefficient_count(coefficients.len(), 1, user_id)?;
                let axis = match tag {
                    "px" => Axis::X,
                    "py" => Axis::Y,
                    _ => Axis::Z,
                };
                Ok(SurfaceKind::AxisPlane {
                    axis,
                    offset: coefficients[0],
                })
            }
            "p" => {
                check_coefficient_count(coefficients.len(), 4, user_id)?;
                let normal =
                    Vector3::new(coefficients[0], coefficients[1], coefficients[2]);
                if normal.norm_squared() == 0.0 {
                    return Err(HeliosError::BadSurfaceCreation {
                        user_id: user_id.to_string(),
                        reason: "plane normal must be non-zero".to_string(),
                    });
                }
                Ok(SurfaceKind::Plane {
                    normal,
                    offset: coefficients[3],
                })
            }
            "c/x" | "c/y" | "c/z" => {
                check_coefficient_count(coefficients.len(), 3, user_id)?;
                check_positive(coefficients[2], user_id, "cylinder radius")?;
                let axis = match tag {
                    "c/x" => Axis::X,
                    "c/y" => Axis::Y,
                    _ => Axis::Z,
                };
                Ok(SurfaceKind::AxisCylinder {
                    axis,
                    center: [coefficients[0], coefficients[1]],
                    radius: coefficients[2],
                })
            }
            "so" => {
                check_coefficient_count(coefficients.len(), 1, user_id)?;
                check_positive(coefficients[0], user_id, "sphere radius")?;
                Ok(SurfaceKind::Sphere {
                    center: Vector3::zeros(),
                    radius: coefficients[0],
                })
            }
            "s" => {
                check_coefficient_count(coefficients.len(), 4, user_id)?;
                check_positive(coefficients[3], user_id, "sphere radius")?;
                Ok(SurfaceKind::Sphere {
                    center: Vector3::new(coefficients[0], coefficients[1], coefficients[2]),
                    radius: coefficients[3],
                })
            }
            "sq" => {
                check_coefficient_count(coefficients.len(), 10, user_id)?;
                let mut c = [0.0; 10];
                c.copy_from_slice(coefficients);
                Ok(SurfaceKind::Quadric { coefficients: c })
            }
            other => Err(HeliosError::BadSurfaceCreation {
                user_id: user_id.to_string(),
                reason: format!("unknown surface tag '{other}'"),
            }),
        }
    }

    /// The external name tag for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            SurfaceKind::AxisPlane { axis: Axis::X, .. } => "px",
            SurfaceKind::AxisPlane { axis: Axis::Y, .. } => "py",
            SurfaceKind::AxisPlane { axis: Axis::Z, .. } => "pz",
            SurfaceKind::Plane { .. } => "p",
            SurfaceKind::AxisCylinder { axis: Axis::X, .. } => "c/x",
            SurfaceKind::AxisCylinder { axis: Axis::Y, .. } => "c/y",
            SurfaceKind::AxisCylinder { axis: Axis::Z, .. } => "c/z",
            SurfaceKind::Sphere { center, .. } if center.norm_squared() == 0.0 => "so",
            SurfaceKind::Sphere { .. } => "s",
            SurfaceKind::Quadric { .. } => "sq",
        }
    }

    /// Signed scalar function at `point`.
    pub fn function(&self, point: &Vector3<f64>) -> f64 {
        match self {
            SurfaceKind::AxisPlane { axis, offset } => point[axis.index()] - offset,
            SurfaceKind::Plane { normal, offset } => normal.dot(point) - offset,
            SurfaceKind::AxisCylinder {
                axis,
                center,
                radius,
            } => {
                let (u, v) = axis.others();
                let du = point[u] - center[0];
                let dv = point[v] - center[1];
                du * du + dv * dv - radius * radius
            }
            SurfaceKind::Sphere { center, radius } => {
                (point - center).norm_squared() - radius * radius
            }
            SurfaceKind::Quadric { coefficients } => {
                let [a, b, c, d, e, f, g, h, i, j] = *coefficients;
                let (x, y, z) = (point.x, point.y, point.z);
                a * x * x
                    + b * y * y
                    + c * z * z
                    + 2.0 * (d * x * y + e * y * z + f * z * x)
                    + 2.0 * (g * x + h * y + i * z)
                    + j
            }
        }
    }

    /// Outward gradient at `point`.
    pub fn normal(&self, point: &Vector3<f64>) -> Vector3<f64> {
        match self {
            SurfaceKind::AxisPlane { axis, .. } => axis.unit(),
            SurfaceKind::Plane { normal, .. } => *normal,
            SurfaceKind::AxisCylinder {
                axis,
                center,
                radius,
            } => {
                let (u, v) = axis.others();
                let mut n = Vector3::zeros();
                n[u] = (point[u] - center[0]) / radius;
                n[v] = (point[v] - center[1]) / radius;
                n
            }
            SurfaceKind::Sphere { center, radius } => (point - center) / *radius,
            SurfaceKind::Quadric { coefficients } => {
                let [a, b, c, d, e, f, g, h, i, _] = *coefficients;
                let (x, y, z) = (point.x, point.y, point.z);
                Vector3::new(
                    2.0 * (a * x + d * y + f * z + g),
                    2.0 * (b * y + d * x + e * z + h),
                    2.0 * (c * z + e * y + f * x + i),
                )
            }
        }
    }

    /// Forward ray-surface distance. See [`Surface::intersect`].
    pub fn intersect(
        &self,
        point: &Vector3<f64>,
        direction: &Vector3<f64>,
        sense: Sense,
        surface_tol: f64,
    ) -> Option<f64> {
        match self {
            SurfaceKind::AxisPlane { axis, offset } => {
                linear_intersect(point[axis.index()] - offset, direction[axis.index()])
            }
            SurfaceKind::Plane { normal, offset } => {
                linear_intersect(normal.dot(point) - offset, normal.dot(direction))
            }
            SurfaceKind::AxisCylinder {
                axis,
                center,
                radius,
            } => {
                let (u, v) = axis.others();
                let du = point[u] - center[0];
                let dv = point[v] - center[1];
                let a = direction[u] * direction[u] + direction[v] * direction[v];
                let k = direction[u] * du + direction[v] * dv;
                let c = du * du + dv * dv - radius * radius;
                quadratic_intersect(a, k, c, sense, surface_tol)
            }
            SurfaceKind::Sphere { center, radius } => {
                let rel = point - center;
                let a = direction.norm_squared();
                let k = direction.dot(&rel);
                let c = rel.norm_squared() - radius * radius;
                quadratic_intersect(a, k, c, sense, surface_tol)
            }
            SurfaceKind::Quadric { coefficients } => {
                let [qa, qb, qc, qd, qe, qf, qg, qh, qi, _] = *coefficients;
                let (x, y, z) = (point.x, point.y, point.z);
                let (dx, dy, dz) = (direction.x, direction.y, direction.z);
                let a = qa * dx * dx
                    + qb * dy * dy
                    + qc * dz * dz
                    + 2.0 * (qd * dx * dy + qe * dy * dz + qf * dz * dx);
                let k = qa * x * dx
                    + qb * y * dy
                    + qc * z * dz
                    + qd * (x * dy + y * dx)
                    + qe * (y * dz + z * dy)
                    + qf * (z * dx + x * dz)
                    + qg * dx
                    + qh * dy
                    + qi * dz;
                let c = self.function(point);
                quadratic_intersect(a, k, c, sense, surface_tol)
            }
        }
    }

    /// This kind with every point shifted by `shift`.
    pub fn translated(&self, shift: &Vector3<f64>) -> SurfaceKind {
        match self {
            SurfaceKind::AxisPlane { axis, offset } => SurfaceKind::AxisPlane {
                axis: *axis,
                offset: offset + shift[axis.index()],
            },
            SurfaceKind::Plane { normal, offset } => SurfaceKind::Plane {
                normal: *normal,
                offset: offset + normal.dot(shift),
            },
            SurfaceKind::AxisCylinder {
                axis,
                center,
                radius,
            } => {
                let (u, v) = axis.others();
                SurfaceKind::AxisCylinder {
                    axis: *axis,
                    center: [center[0] + shift[u], center[1] + shift[v]],
                    radius: *radius,
                }
            }
            SurfaceKind::Sphere { center, radius } => SurfaceKind::Sphere {
                center: center + shift,
                radius: *radius,
            },
            SurfaceKind::Quadric { coefficients } => {
                // f(p - s): the quadratic part is shift-invariant, the linear
                // part becomes g - M s and the constant picks up s^T M s - 2 g.s.
                let [a, b, c, d, e, f, g, h, i, j] = *coefficients;
                let m = Matrix3::new(a, d, f, d, b, e, f, e, c);
                let lin = Vector3::new(g, h, i);
                let ms = m * shift;
                let new_lin = lin - ms;
                let new_j = shift.dot(&ms) - 2.0 * lin.dot(shift) + j;
                SurfaceKind::Quadric {
                    coefficients: [a, b, c, d, e, f, new_lin.x, new_lin.y, new_lin.z, new_j],
                }
            }
        }
    }
}

/// Forward distance to the zero of a linear function `value + slope * t`.
#[inline]
fn linear_intersect(value: f64, slope: f64) -> Option<f64> {
    if slope.abs() < QUADRATIC_DEGENERACY {
        return None;
    }
    let t = -value / slope;
    (t > 0.0).then_some(t)
}

/// Forward distance to the roots of `a t^2 + 2 k t + c = 0`.
///
/// `sense` is the particle's current half-space: inside a convex interior
/// (`Negative`, `c < 0`) the next crossing is the larger positive root;
/// outside (`Positive`) it is the smaller one. When `|c|` is below
/// `surface_tol` the particle sits on the surface: the near-zero root is the
/// surface itself, so the far root is returned when it lies forward.
pub fn quadratic_intersect(
    a: f64,
    k: f64,
    c: f64,
    sense: Sense,
    surface_tol: f64,
) -> Option<f64> {
    if a.abs() < QUADRATIC_DEGENERACY {
        return linear_intersect(c, 2.0 * k);
    }
    let discriminant = k * k - a * c;
    if discriminant <= 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let r1 = (-k - sqrt_d) / a;
    let r2 = (-k + sqrt_d) / a;
    let (t_min, t_max) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };

    if c.abs() < surface_tol {
        // On the surface: discard the root at the particle's own position and
        // keep the one consistent with d . grad(f).
        let t_far = if t_min.abs() > t_max.abs() { t_min } else { t_max };
        return (t_far > surface_tol).then_some(t_far);
    }

    match sense {
        Sense::Negative => (t_max > 0.0).then_some(t_max),
        Sense::Positive => (t_min > 0.0).then_some(t_min),
    }
}
