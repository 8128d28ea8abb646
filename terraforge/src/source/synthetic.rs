//! Deterministic procedural terrain source.
//!
//! Registered as the tail of the elevation fallback chain so the pipeline
//! always produces *some* heightmap even when every real provider is down.
//! Output is fully determined by (seed, bbox, resolution): three octaves of
//! phase-shifted sinusoids plus seeded noise, shifted to positive elevation.

use std::f64::consts::PI;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::coord::BoundingBox;
use crate::terrain::slope_degrees;

use super::descriptor::{
    Capability, DataSource, ElevationGrid, SourceFuture, VectorKind, VectorSet,
};

/// Base elevation added after shifting the surface to positive values.
const BASE_ELEVATION_M: f32 = 100.0;

/// Always-available synthetic elevation source.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Generates the elevation grid for a request.
    ///
    /// Deterministic: the per-request RNG is seeded from the configured seed
    /// mixed with the bounding box, so the same request always yields the
    /// same terrain while different areas do not repeat.
    pub fn generate(&self, bbox: &BoundingBox, resolution: u32) -> Array2<f32> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ bbox_discriminant(bbox));

        // Random phase per octave keeps different seeds from producing
        // identical ridgelines.
        let phases: [(f64, f64); 3] = [
            (rng.random_range(0.0..2.0 * PI), rng.random_range(0.0..2.0 * PI)),
            (rng.random_range(0.0..2.0 * PI), rng.random_range(0.0..2.0 * PI)),
            (rng.random_range(0.0..2.0 * PI), rng.random_range(0.0..2.0 * PI)),
        ];

        let n = resolution as usize;
        let step = 8.0 * PI / n.max(1) as f64;

        let mut height = Array2::zeros((n, n));
        for r in 0..n {
            for c in 0..n {
                let x = c as f64 * step;
                let y = r as f64 * step;
                let surface = (x + phases[0].0).sin() * (y + phases[0].1).cos() * 100.0
                    + (2.0 * x + phases[1].0).sin() * (2.0 * y + phases[1].1).cos() * 50.0
                    + (4.0 * x + phases[2].0).sin() * (4.0 * y + phases[2].1).cos() * 25.0;
                let noise = rng.random_range(-10.0..10.0);
                height[[r, c]] = (surface + noise) as f32;
            }
        }

        // Shift to positive elevations
        let min = height.iter().copied().fold(f32::INFINITY, f32::min);
        height.mapv_inplace(|v| v - min + BASE_ELEVATION_M);

        let slope = slope_degrees(&height);
        let mean_slope = slope.iter().sum::<f32>() / slope.len().max(1) as f32;
        debug!(
            resolution,
            mean_slope_deg = mean_slope,
            "synthetic terrain generated"
        );

        height
    }
}

impl DataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::ElevationDem]
    }

    fn priority_rank(&self) -> u32 {
        // Always last in the default chain
        u32::MAX
    }

    fn is_available(&self) -> bool {
        true
    }

    fn get_elevation(
        &self,
        bbox: BoundingBox,
        resolution: u32,
    ) -> SourceFuture<'_, Option<ElevationGrid>> {
        warn!(%bbox, "falling back to synthetic terrain - not real world data");
        let data = self.generate(&bbox, resolution);
        Box::pin(async move { Ok(Some(ElevationGrid::new(data))) })
    }

    fn get_vectors(
        &self,
        _bbox: BoundingBox,
        _kinds: Vec<VectorKind>,
    ) -> SourceFuture<'_, Option<VectorSet>> {
        // Absence of vectors is the valid degraded state; nothing synthetic
        Box::pin(async move { Ok(None) })
    }
}

/// Folds the rounded bounding box into a 64-bit discriminant.
fn bbox_discriminant(bbox: &BoundingBox) -> u64 {
    let mut acc: u64 = 0xcbf2_9ce4_8422_2325;
    for v in [bbox.north, bbox.south, bbox.east, bbox.west] {
        let quantized = (v * 1e6).round() as i64;
        acc ^= quantized as u64;
        acc = acc.wrapping_mul(0x0000_0100_0000_01b3);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(47.0, 46.0, 8.0, 7.0)
    }

    #[test]
    fn generation_is_deterministic() {
        let source = SyntheticSource::new(7);
        let a = source.generate(&bbox(), 64);
        let b = source.generate(&bbox(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = SyntheticSource::new(1).generate(&bbox(), 64);
        let b = SyntheticSource::new(2).generate(&bbox(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn different_areas_differ() {
        let source = SyntheticSource::new(7);
        let a = source.generate(&bbox(), 64);
        let b = source.generate(&BoundingBox::new(48.0, 47.0, 8.0, 7.0), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn elevations_are_positive() {
        let height = SyntheticSource::new(0).generate(&bbox(), 32);
        assert!(height.iter().all(|&v| v >= BASE_ELEVATION_M - 1e-3));
    }

    #[test]
    fn output_matches_requested_resolution() {
        let height = SyntheticSource::new(0).generate(&bbox(), 128);
        assert_eq!(height.dim(), (128, 128));
    }

    #[tokio::test]
    async fn descriptor_contract() {
        let source = SyntheticSource::new(0);
        assert!(source.is_available());
        assert_eq!(source.priority_rank(), u32::MAX);

        let elevation = source.get_elevation(bbox(), 16).await.unwrap();
        assert!(elevation.is_some());

        let vectors = source
            .get_vectors(bbox(), vec![VectorKind::Roads])
            .await
            .unwrap();
        assert!(vectors.is_none());
    }
}
