//! Heightmap resampling and normalization.
//!
//! Exporters whose target formats only accept fixed grid sizes resize
//! through [`resize_bilinear`] before encoding.

use ndarray::Array2;

/// Resizes a grid to `target` x `target` pixels with bilinear interpolation.
///
/// Returns the input unchanged if it already has the target size.
pub fn resize_bilinear(grid: &Array2<f32>, target: usize) -> Array2<f32> {
    let (rows, cols) = grid.dim();
    if rows == target && cols == target {
        return grid.clone();
    }

    let row_scale = if target > 1 {
        (rows - 1) as f32 / (target - 1) as f32
    } else {
        0.0
    };
    let col_scale = if target > 1 {
        (cols - 1) as f32 / (target - 1) as f32
    } else {
        0.0
    };

    Array2::from_shape_fn((target, target), |(r, c)| {
        let src_r = r as f32 * row_scale;
        let src_c = c as f32 * col_scale;

        let r0 = src_r.floor() as usize;
        let c0 = src_c.floor() as usize;
        let r1 = (r0 + 1).min(rows - 1);
        let c1 = (c0 + 1).min(cols - 1);

        let fr = src_r - r0 as f32;
        let fc = src_c - c0 as f32;

        let top = grid[[r0, c0]] * (1.0 - fc) + grid[[r0, c1]] * fc;
        let bottom = grid[[r1, c0]] * (1.0 - fc) + grid[[r1, c1]] * fc;
        top * (1.0 - fr) + bottom * fr
    })
}

/// Linearly rescales values into `[target_min, target_max]`.
///
/// A constant grid maps to `target_min`.
pub fn normalize_to_range(grid: &Array2<f32>, target_min: f32, target_max: f32) -> Array2<f32> {
    let min = grid.iter().copied().fold(f32::INFINITY, f32::min);
    let max = grid.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if max == min {
        return Array2::from_elem(grid.raw_dim(), target_min);
    }

    grid.mapv(|v| (v - min) / (max - min) * (target_max - target_min) + target_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_size_is_identity() {
        let grid = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f32);
        let out = resize_bilinear(&grid, 4);
        assert_eq!(out, grid);
    }

    #[test]
    fn upsample_preserves_corners() {
        let grid = Array2::from_shape_fn((3, 3), |(r, c)| (r * 10 + c) as f32);
        let out = resize_bilinear(&grid, 9);

        assert_eq!(out[[0, 0]], grid[[0, 0]]);
        assert_eq!(out[[0, 8]], grid[[0, 2]]);
        assert_eq!(out[[8, 0]], grid[[2, 0]]);
        assert_eq!(out[[8, 8]], grid[[2, 2]]);
    }

    #[test]
    fn upsample_interpolates_midpoints() {
        let grid = ndarray::array![[0.0, 2.0], [0.0, 2.0]];
        let out = resize_bilinear(&grid, 3);
        assert!((out[[1, 1]] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn downsample_stays_within_input_range() {
        let grid = Array2::from_shape_fn((64, 64), |(r, c)| ((r * c) as f32).sin() * 100.0);
        let out = resize_bilinear(&grid, 17);
        let min = grid.iter().copied().fold(f32::INFINITY, f32::min);
        let max = grid.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(out.iter().all(|&v| v >= min - 1e-3 && v <= max + 1e-3));
    }

    #[test]
    fn normalize_maps_to_target_range() {
        let grid = ndarray::array![[10.0, 20.0], [30.0, 40.0]];
        let out = normalize_to_range(&grid, 0.0, 1.0);
        assert_eq!(out[[0, 0]], 0.0);
        assert_eq!(out[[1, 1]], 1.0);
    }

    #[test]
    fn normalize_constant_grid_maps_to_min() {
        let grid = Array2::from_elem((3, 3), 7.0);
        let out = normalize_to_range(&grid, 5.0, 9.0);
        assert!(out.iter().all(|&v| v == 5.0));
    }
}
