//! Synchronous request validation.
//!
//! Admission is the only synchronous front door: every check here runs
//! before a request touches the queue or any I/O, so malformed requests
//! never occupy a queue slot.

use thiserror::Error;

use crate::config::GenerationConfig;
use crate::coord::{BoundingBox, BoundsError};
use crate::export::ExportFanout;

/// Smallest accepted heightmap resolution.
pub const MIN_RESOLUTION: u32 = 64;

/// Largest accepted heightmap resolution.
pub const MAX_RESOLUTION: u32 = 8192;

/// Default area limit in square kilometres.
pub const DEFAULT_MAX_AREA_KM2: f64 = 100.0;

/// Reasons a request is rejected at the door.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Bounding box malformed
    #[error("invalid bounding box: {0}")]
    InvalidBounds(#[from] BoundsError),

    /// Requested area exceeds the configured limit
    #[error("area too large: {area_km2:.2} km² (max: {max_km2:.2} km²)")]
    AreaTooLarge { area_km2: f64, max_km2: f64 },

    /// Resolution outside the supported range
    #[error("resolution {0} outside supported range [{MIN_RESOLUTION}, {MAX_RESOLUTION}]")]
    InvalidResolution(u32),

    /// Empty terrain name
    #[error("terrain name must not be empty")]
    EmptyName,

    /// Requested export format is not registered
    #[error("unknown export format: {0}")]
    UnknownFormat(String),

    /// No export formats requested
    #[error("at least one export format is required")]
    NoFormats,
}

/// Validates a request against the area bound, resolution range, and the
/// registered export formats.
pub fn validate_request(
    name: &str,
    bbox: &BoundingBox,
    config: &GenerationConfig,
    max_area_km2: f64,
    fanout: &ExportFanout,
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }

    bbox.validate()?;

    let area_km2 = bbox.area_km2();
    if area_km2 > max_area_km2 {
        return Err(ValidationError::AreaTooLarge {
            area_km2,
            max_km2: max_area_km2,
        });
    }

    if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&config.resolution) {
        return Err(ValidationError::InvalidResolution(config.resolution));
    }

    if config.export_formats.is_empty() {
        return Err(ValidationError::NoFormats);
    }
    for format in &config.export_formats {
        if !fanout.knows(format) {
            return Err(ValidationError::UnknownFormat(format.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_bbox() -> BoundingBox {
        BoundingBox::new(47.05, 47.0, 8.05, 8.0)
    }

    fn config() -> GenerationConfig {
        GenerationConfig {
            resolution: 1024,
            export_formats: vec!["unreal5".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn valid_request_passes() {
        let fanout = ExportFanout::with_defaults();
        assert!(validate_request("alps", &small_bbox(), &config(), 100.0, &fanout).is_ok());
    }

    #[test]
    fn malformed_bbox_rejected() {
        let fanout = ExportFanout::with_defaults();
        let bbox = BoundingBox::new(47.0, 47.05, 8.05, 8.0);
        assert!(matches!(
            validate_request("alps", &bbox, &config(), 100.0, &fanout),
            Err(ValidationError::InvalidBounds(_))
        ));
    }

    #[test]
    fn oversized_area_rejected() {
        let fanout = ExportFanout::with_defaults();
        let bbox = BoundingBox::new(50.0, 45.0, 15.0, 5.0);
        let err = validate_request("alps", &bbox, &config(), 100.0, &fanout).unwrap_err();
        assert!(matches!(err, ValidationError::AreaTooLarge { .. }));
    }

    #[test]
    fn resolution_bounds_enforced() {
        let fanout = ExportFanout::with_defaults();
        let mut cfg = config();
        cfg.resolution = 32;
        assert_eq!(
            validate_request("alps", &small_bbox(), &cfg, 100.0, &fanout),
            Err(ValidationError::InvalidResolution(32))
        );

        cfg.resolution = 16384;
        assert!(validate_request("alps", &small_bbox(), &cfg, 100.0, &fanout).is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let fanout = ExportFanout::with_defaults();
        let mut cfg = config();
        cfg.export_formats = vec!["quake2".to_string()];
        assert_eq!(
            validate_request("alps", &small_bbox(), &cfg, 100.0, &fanout),
            Err(ValidationError::UnknownFormat("quake2".to_string()))
        );
    }

    #[test]
    fn wildcard_format_accepted() {
        let fanout = ExportFanout::with_defaults();
        let mut cfg = config();
        cfg.export_formats = vec!["all".to_string()];
        assert!(validate_request("alps", &small_bbox(), &cfg, 100.0, &fanout).is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        let fanout = ExportFanout::with_defaults();
        assert_eq!(
            validate_request("  ", &small_bbox(), &config(), 100.0, &fanout),
            Err(ValidationError::EmptyName)
        );
    }

    #[test]
    fn empty_format_list_rejected() {
        let fanout = ExportFanout::with_defaults();
        let mut cfg = config();
        cfg.export_formats.clear();
        assert_eq!(
            validate_request("alps", &small_bbox(), &cfg, 100.0, &fanout),
            Err(ValidationError::NoFormats)
        );
    }
}
