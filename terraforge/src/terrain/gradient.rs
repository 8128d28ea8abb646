//! Finite-difference gradients and slope.
//!
//! One shared primitive: central differences in the interior, one-sided at
//! the edges. Used by weightmap classification, hillshade previews, and the
//! synthetic source's slope diagnostics.

use ndarray::Array2;

/// Computes per-axis gradients of a heightmap.
///
/// Returns `(dy, dx)`: the rate of change along rows (north-south) and
/// columns (east-west), in height units per pixel.
pub fn gradient(height: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
    let (rows, cols) = height.dim();
    let mut dy = Array2::zeros((rows, cols));
    let mut dx = Array2::zeros((rows, cols));

    for r in 0..rows {
        for c in 0..cols {
            dy[[r, c]] = if rows == 1 {
                0.0
            } else if r == 0 {
                height[[1, c]] - height[[0, c]]
            } else if r == rows - 1 {
                height[[r, c]] - height[[r - 1, c]]
            } else {
                (height[[r + 1, c]] - height[[r - 1, c]]) / 2.0
            };

            dx[[r, c]] = if cols == 1 {
                0.0
            } else if c == 0 {
                height[[r, 1]] - height[[r, 0]]
            } else if c == cols - 1 {
                height[[r, c]] - height[[r, c - 1]]
            } else {
                (height[[r, c + 1]] - height[[r, c - 1]]) / 2.0
            };
        }
    }

    (dy, dx)
}

/// Slope angle per pixel, in degrees.
///
/// `slope = atan(|∇h|)` with the gradient magnitude taken over both axes.
pub fn slope_degrees(height: &Array2<f32>) -> Array2<f32> {
    let (dy, dx) = gradient(height);
    let mut slope = Array2::zeros(height.raw_dim());
    ndarray::Zip::from(&mut slope)
        .and(&dy)
        .and(&dx)
        .for_each(|s, &gy, &gx| {
            *s = (gy * gy + gx * gx).sqrt().atan().to_degrees();
        });
    slope
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn flat_terrain_has_zero_slope() {
        let height = Array2::from_elem((8, 8), 42.0);
        let slope = slope_degrees(&height);
        assert!(slope.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn unit_ramp_has_45_degree_slope() {
        // Height increases by 1 per column
        let height = Array2::from_shape_fn((4, 4), |(_, c)| c as f32);
        let slope = slope_degrees(&height);
        for &s in slope.iter() {
            assert!((s - 45.0).abs() < 1e-4, "expected 45 degrees, got {s}");
        }
    }

    #[test]
    fn central_difference_in_interior() {
        let height = array![[0.0, 1.0, 4.0], [0.0, 1.0, 4.0], [0.0, 1.0, 4.0]];
        let (_, dx) = gradient(&height);
        // Interior column: (4 - 0) / 2 = 2
        assert_eq!(dx[[1, 1]], 2.0);
        // Edges are one-sided
        assert_eq!(dx[[1, 0]], 1.0);
        assert_eq!(dx[[1, 2]], 3.0);
    }

    #[test]
    fn gradient_axes_are_independent() {
        // Height varies only along rows
        let height = Array2::from_shape_fn((5, 5), |(r, _)| (r * 2) as f32);
        let (dy, dx) = gradient(&height);
        assert!(dx.iter().all(|&v| v == 0.0));
        assert_eq!(dy[[2, 2]], 2.0);
    }

    #[test]
    fn single_row_has_no_row_gradient() {
        let height = Array2::from_shape_fn((1, 4), |(_, c)| c as f32);
        let (dy, _) = gradient(&height);
        assert!(dy.iter().all(|&v| v == 0.0));
    }
}
