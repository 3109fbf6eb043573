//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};
use crate::scene::BandTriplet;
use crate::tile::TileSize;

/// Date format for `start_date` / `end_date`.
pub(super) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = non_empty(section.get("root")) {
            config.output.root = expand_tilde(v);
        }
        if let Some(v) = section.get("staging") {
            config.output.staging = non_empty(Some(v)).map(expand_tilde);
        }
        if let Some(v) = section.get("key_style") {
            config.output.key_style = parse_with(
                "output",
                "key_style",
                v,
                "must be 'id' or 'id_with_date'",
            )?;
        }
    }

    // [imagery] section
    if let Some(section) = ini.section(Some("imagery")) {
        if let Some(v) = section.get("mode") {
            config.imagery.mode =
                parse_with("imagery", "mode", v, "must be 'rgb' or 'greyscale'")?;
        }
        if let Some(v) = section.get("bands") {
            let labels: Vec<&str> = v.split(',').map(str::trim).collect();
            match labels.as_slice() {
                [b2, b3, b4] if !b2.is_empty() && !b3.is_empty() && !b4.is_empty() => {
                    config.imagery.bands = BandTriplet::new(*b2, *b3, *b4);
                }
                _ => {
                    return Err(invalid(
                        "imagery",
                        "bands",
                        v,
                        "expected three comma-separated labels like 'B02,B03,B04'",
                    ))
                }
            }
        }
        if let Some(v) = section.get("band_filter") {
            let v = v.trim();
            glob::Pattern::new(v)
                .map_err(|e| invalid("imagery", "band_filter", v, &e.to_string()))?;
            config.imagery.band_filter = v.to_string();
        }
        if let Some(v) = section.get("fallback_epsg") {
            config.imagery.fallback_epsg =
                parse_with("imagery", "fallback_epsg", v, "must be an EPSG code")?;
        }
    }

    // [tiling] section
    if let Some(section) = ini.section(Some("tiling")) {
        let width = match section.get("width") {
            Some(v) => parse_with("tiling", "width", v, "must be a positive integer")?,
            None => config.tiling.size.width(),
        };
        let height = match section.get("height") {
            Some(v) => parse_with("tiling", "height", v, "must be a positive integer")?,
            None => config.tiling.size.height(),
        };
        config.tiling.size = TileSize::new(width, height).map_err(|e| {
            invalid(
                "tiling",
                "width/height",
                &format!("{}x{}", width, height),
                &e.to_string(),
            )
        })?;

        if let Some(v) = section.get("buffer_radius") {
            let trimmed = v.trim();
            config.tiling.buffer_radius =
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
                    None
                } else {
                    let radius: f64 = parse_with(
                        "tiling",
                        "buffer_radius",
                        v,
                        "must be a non-negative number or 'none'",
                    )?;
                    if !radius.is_finite() || radius < 0.0 {
                        return Err(invalid(
                            "tiling",
                            "buffer_radius",
                            v,
                            "must be a non-negative number or 'none'",
                        ));
                    }
                    Some(radius)
                };
        }
    }

    // [query] section
    if let Some(section) = ini.section(Some("query")) {
        if let Some(v) = non_empty(section.get("platform")) {
            config.query.platform = v.to_string();
        }
        if let Some(v) = non_empty(section.get("processing_level")) {
            config.query.processing_level = v.to_string();
        }
        if let Some(v) = section.get("max_cloud_cover") {
            let max: f64 = parse_with(
                "query",
                "max_cloud_cover",
                v,
                "must be a percentage between 0 and 100",
            )?;
            if !(0.0..=100.0).contains(&max) {
                return Err(invalid(
                    "query",
                    "max_cloud_cover",
                    v,
                    "must be a percentage between 0 and 100",
                ));
            }
            config.query.max_cloud_cover = max;
        }
        if let Some(v) = section.get("limit") {
            config.query.limit = parse_positive("query", "limit", v)?;
        }
        if let Some(v) = section.get("top_k") {
            config.query.top_k = parse_positive("query", "top_k", v)?;
        }
        if let Some(v) = section.get("start_date") {
            config.query.start_date = parse_date("start_date", v)?;
        }
        if let Some(v) = section.get("end_date") {
            config.query.end_date = parse_date("end_date", v)?;
        }
        if let (Some(start), Some(end)) = (config.query.start_date, config.query.end_date) {
            if start > end {
                return Err(invalid(
                    "query",
                    "end_date",
                    &end.format(DATE_FORMAT).to_string(),
                    "must not be before start_date",
                ));
            }
        }
    }

    // [pipeline] section
    if let Some(section) = ini.section(Some("pipeline")) {
        if let Some(v) = section.get("regions") {
            config.pipeline.regions = parse_with(
                "pipeline",
                "regions",
                v,
                "must be 'all', an index like '3' or a range like '2..5'",
            )?;
        }
        if let Some(v) = section.get("workers") {
            config.pipeline.workers = parse_positive("pipeline", "workers", v)?;
        }
        if let Some(v) = section.get("keep_downloads") {
            config.pipeline.keep_downloads = parse_bool("pipeline", "keep_downloads", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_with<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<usize, ConfigFileError> {
    let reason = "must be a positive integer";
    let n: usize = parse_with(section, key, value, reason)?;
    if n == 0 {
        return Err(invalid(section, key, value, reason));
    }
    Ok(n)
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn parse_date(key: &str, value: &str) -> Result<Option<NaiveDate>, ConfigFileError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| invalid("query", key, value, "expected a date like 2023-07-01"))
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
