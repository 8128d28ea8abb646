//! Geographic bounding box primitives.
//!
//! A [`BoundingBox`] describes the area a generation request covers, in
//! WGS84 degrees. Validation lives here so that admission and the data
//! sources can share one definition of "well-formed".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kilometres per degree of latitude (and of longitude at the equator).
const KM_PER_DEGREE: f64 = 111.32;

/// Errors produced when validating a bounding box.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundsError {
    /// A coordinate was NaN or infinite
    #[error("coordinate is not finite")]
    NotFinite,

    /// Latitude outside [-90, 90]
    #[error("latitude {0} outside [-90, 90]")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180]
    #[error("longitude {0} outside [-180, 180]")]
    InvalidLongitude(f64),

    /// North edge not strictly above south edge
    #[error("north ({north}) must be greater than south ({south})")]
    Inverted { north: f64, south: f64 },

    /// East edge not strictly beyond west edge
    #[error("east ({east}) must be greater than west ({west})")]
    Degenerate { east: f64, west: f64 },
}

/// Geographic bounding box in WGS84 degrees.
///
/// Invariant (enforced by [`BoundingBox::validate`]): `north > south` and
/// `east > west`, all coordinates finite and within range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// North latitude (degrees)
    pub north: f64,
    /// South latitude (degrees)
    pub south: f64,
    /// East longitude (degrees)
    pub east: f64,
    /// West longitude (degrees)
    pub west: f64,
}

impl BoundingBox {
    /// Creates a bounding box without validating it.
    ///
    /// Call [`validate`](Self::validate) before using the box for admission.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Checks the box is well-formed.
    pub fn validate(&self) -> Result<(), BoundsError> {
        for v in [self.north, self.south, self.east, self.west] {
            if !v.is_finite() {
                return Err(BoundsError::NotFinite);
            }
        }
        for lat in [self.north, self.south] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(BoundsError::InvalidLatitude(lat));
            }
        }
        for lon in [self.east, self.west] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(BoundsError::InvalidLongitude(lon));
            }
        }
        if self.north <= self.south {
            return Err(BoundsError::Inverted {
                north: self.north,
                south: self.south,
            });
        }
        if self.east <= self.west {
            return Err(BoundsError::Degenerate {
                east: self.east,
                west: self.west,
            });
        }
        Ok(())
    }

    /// Center point as (latitude, longitude).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Width in degrees of longitude.
    #[inline]
    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees of latitude.
    #[inline]
    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }

    /// Approximate area in square kilometres.
    ///
    /// Equirectangular approximation with a cosine correction at the mean
    /// latitude. Adequate for admission limits; not survey-grade.
    pub fn area_km2(&self) -> f64 {
        let lat_diff = self.height_deg();
        let lon_diff = self.width_deg();
        let avg_lat = (self.north + self.south) / 2.0;
        (lat_diff * lon_diff * avg_lat.to_radians().cos() * KM_PER_DEGREE * KM_PER_DEGREE).abs()
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.4}N {:.4}S {:.4}E {:.4}W]",
            self.north, self.south, self.east, self.west
        )
    }
}
