//! Hillshade preview rendering.
//!
//! Produces the shaded-relief raster used for quick previews of a generated
//! heightmap. Shares the gradient primitive with weightmap classification.

use ndarray::Array2;

use super::gradient::gradient;

/// Computes a hillshade raster with values in [0, 1].
///
/// # Arguments
///
/// * `height` - Elevation grid
/// * `azimuth_deg` - Light direction, degrees clockwise from north
/// * `altitude_deg` - Light elevation above the horizon, degrees
pub fn hillshade(height: &Array2<f32>, azimuth_deg: f32, altitude_deg: f32) -> Array2<f32> {
    let (dy, dx) = gradient(height);

    // Compass azimuth (clockwise from north) to math angle
    // (counter-clockwise from east), the convention atan2 aspects use
    let azimuth = (360.0 - azimuth_deg + 90.0).to_radians();
    let altitude = altitude_deg.to_radians();

    let mut shade = Array2::zeros(height.raw_dim());
    ndarray::Zip::from(&mut shade)
        .and(&dy)
        .and(&dx)
        .for_each(|out, &gy, &gx| {
            let slope = (gx * gx + gy * gy).sqrt().atan();
            let aspect = gy.atan2(-gx);
            let value = altitude.sin() * slope.cos()
                + altitude.cos() * slope.sin() * (azimuth - aspect).cos();
            *out = value.clamp(0.0, 1.0);
        });
    shade
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_terrain_shades_uniformly() {
        let height = Array2::from_elem((8, 8), 50.0);
        let shade = hillshade(&height, 315.0, 45.0);

        let first = shade[[0, 0]];
        assert!(shade.iter().all(|&v| (v - first).abs() < 1e-6));
        // sin(45 deg) for flat ground
        assert!((first - 45f32.to_radians().sin()).abs() < 1e-4);
    }

    #[test]
    fn output_is_normalized() {
        let height = Array2::from_shape_fn((16, 16), |(r, c)| ((r + c) as f32 * 13.0).sin() * 80.0);
        let shade = hillshade(&height, 315.0, 45.0);
        assert!(shade.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn lit_and_shadowed_faces_differ() {
        // A single ridge running north-south
        let height = Array2::from_shape_fn((16, 16), |(_, c)| {
            let d = (c as f32 - 8.0).abs();
            (8.0 - d).max(0.0) * 50.0
        });
        // Light from due east
        let shade = hillshade(&height, 90.0, 30.0);
        let east_face = shade[[8, 12]];
        let west_face = shade[[8, 4]];
        assert!(
            east_face > west_face,
            "east face ({east_face}) should be brighter than west face ({west_face})"
        );
    }
}
