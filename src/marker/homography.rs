//! Four-point plane-to-image homography

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use super::Point2;

/// Projective map from marker cell space to image pixels
#[derive(Clone, Debug)]
pub struct Homography {
    h: Matrix3<f64>,
}

impl Homography {
    /// Solve for H with `dst[i] ≈ H * src[i]`, fixing h33 = 1.
    ///
    /// Returns `None` for degenerate configurations (collinear points).
    pub fn from_correspondences(src: &[[f64; 2]; 4], dst: &[Point2; 4]) -> Option<Self> {
        if quad_area(dst).abs() < 1e-3 {
            return None;
        }

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let (x, y) = (src[i][0], src[i][1]);
            let (u, v) = (dst[i].x as f64, dst[i].y as f64);

            // u = (h11 x + h12 y + h13) / (h31 x + h32 y + 1)
            a[(2 * i, 0)] = x;
            a[(2 * i, 1)] = y;
            a[(2 * i, 2)] = 1.0;
            a[(2 * i, 6)] = -u * x;
            a[(2 * i, 7)] = -u * y;
            b[2 * i] = u;

            // v = (h21 x + h22 y + h23) / (h31 x + h32 y + 1)
            a[(2 * i + 1, 3)] = x;
            a[(2 * i + 1, 4)] = y;
            a[(2 * i + 1, 5)] = 1.0;
            a[(2 * i + 1, 6)] = -v * x;
            a[(2 * i + 1, 7)] = -v * y;
            b[2 * i + 1] = v;
        }

        let solution = a.lu().solve(&b)?;
        if solution.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let h = Matrix3::new(
            solution[0], solution[1], solution[2],
            solution[3], solution[4], solution[5],
            solution[6], solution[7], 1.0,
        );
        Some(Self { h })
    }

    /// Map a cell-space point into the image
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let p = self.h * Vector3::new(x, y, 1.0);
        if p[2].abs() < 1e-12 {
            return None;
        }
        Some((p[0] / p[2], p[1] / p[2]))
    }
}

/// Signed shoelace area; positive when the corners run clockwise on screen
pub fn quad_area(corners: &[Point2; 4]) -> f64 {
    let mut twice = 0.0;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        twice += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    twice / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: [[f64; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    #[test]
    fn test_maps_corners() {
        let dst = [
            Point2::new(10.0, 20.0),
            Point2::new(110.0, 25.0),
            Point2::new(105.0, 130.0),
            Point2::new(5.0, 120.0),
        ];
        let h = Homography::from_correspondences(&UNIT, &dst).unwrap();
        for (src, expected) in UNIT.iter().zip(dst.iter()) {
            let (u, v) = h.project(src[0], src[1]).unwrap();
            assert!((u - expected.x as f64).abs() < 1e-6);
            assert!((v - expected.y as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn test_scale_only() {
        let dst = [
            Point2::new(0.0, 0.0),
            Point2::new(70.0, 0.0),
            Point2::new(70.0, 70.0),
            Point2::new(0.0, 70.0),
        ];
        let h = Homography::from_correspondences(&UNIT, &dst).unwrap();
        let (u, v) = h.project(0.5, 0.25).unwrap();
        assert!((u - 35.0).abs() < 1e-6);
        assert!((v - 17.5).abs() < 1e-6);
    }

    #[test]
    fn test_quad_area_orientation() {
        let clockwise = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        assert_eq!(quad_area(&clockwise), 16.0);

        let counter = [clockwise[0], clockwise[3], clockwise[2], clockwise[1]];
        assert_eq!(quad_area(&counter), -16.0);
    }

    #[test]
    fn test_degenerate() {
        let dst = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(30.0, 0.0),
        ];
        assert!(Homography::from_correspondences(&UNIT, &dst).is_none());
    }
}
