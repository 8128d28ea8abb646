//! Material weightmap classification.
//!
//! Classifies each pixel into rock/grass/dirt/sand fractions from slope and
//! normalized elevation using fixed thresholds: steep slopes read as rock,
//! low flat ground as sand, mid-elevation gentle ground as grass, and dirt
//! fills the remainder. Fractions are normalized to sum to 1 per pixel with
//! an epsilon floor on the divisor.

use ndarray::{Array2, Zip};

use super::gradient::slope_degrees;

/// Divisor floor when normalizing per-pixel fractions.
const NORMALIZE_EPSILON: f32 = 1e-3;

/// Per-pixel material blend layers. Each array holds fractions in [0, 1];
/// the four fractions sum to 1 at every pixel.
#[derive(Debug, Clone)]
pub struct Weightmaps {
    pub rock: Array2<f32>,
    pub grass: Array2<f32>,
    pub dirt: Array2<f32>,
    pub sand: Array2<f32>,
}

impl Weightmaps {
    /// Layer names and arrays in a stable order, for exporters.
    pub fn layers(&self) -> [(&'static str, &Array2<f32>); 4] {
        [
            ("rock", &self.rock),
            ("grass", &self.grass),
            ("dirt", &self.dirt),
            ("sand", &self.sand),
        ]
    }
}

/// Generates material weightmaps from a heightmap.
pub fn generate_weightmaps(height: &Array2<f32>) -> Weightmaps {
    let slope = slope_degrees(height);

    let min = height.iter().copied().fold(f32::INFINITY, f32::min);
    let max = height.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min + 1e-6;

    let dim = height.raw_dim();
    let mut rock = Array2::zeros(dim.clone());
    let mut grass = Array2::zeros(dim.clone());
    let mut dirt = Array2::zeros(dim.clone());
    let mut sand = Array2::zeros(dim);

    Zip::from(&mut rock)
        .and(&mut grass)
        .and(&mut dirt)
        .and(&mut sand)
        .and(&slope)
        .and(height)
        .par_for_each(|rock, grass, dirt, sand, &slope, &h| {
            let h_norm = (h - min) / range;

            let r = ((slope - 30.0) / 30.0).clamp(0.0, 1.0);
            let s = (1.0 - h_norm) * (1.0 - (slope / 15.0).clamp(0.0, 1.0));
            let g = (1.0 - (h_norm - 0.5).abs() * 2.0) * (1.0 - (slope / 20.0).clamp(0.0, 1.0));
            let d = (1.0 - (r + g + s)).clamp(0.0, 1.0);

            let total = (r + g + d + s).max(NORMALIZE_EPSILON);
            *rock = r / total;
            *grass = g / total;
            *dirt = d / total;
            *sand = s / total;
        });

    Weightmaps {
        rock,
        grass,
        dirt,
        sand,
    }
}
