//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written to `config.ini`.

use std::path::Path;

use super::file::ConfigFile;
use super::parser::DATE_FORMAT;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let staging = config
        .output
        .staging
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();
    let buffer_radius = config
        .tiling
        .buffer_radius
        .map(|r| r.to_string())
        .unwrap_or_else(|| "none".to_string());
    let start_date = config
        .query
        .start_date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    let end_date = config
        .query
        .end_date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    let bands = config.imagery.bands.labels().join(",");

    format!(
        r#"[output]
; Root directory for scene output ({{root}}/{{scene}}/...)
root = {}
; Download staging directory (empty = system temp directory)
staging = {}
; Scene directory naming:
;   id           - scene id
;   id_with_date - scene id followed by _YYYYMMDD of the ingestion date
key_style = {}

[imagery]
; Composite form: rgb or greyscale
mode = {}
; Band labels matched in downloaded file names (composite order)
bands = {}
; Glob selecting which product files are downloaded
band_filter = {}
; EPSG code assumed when a band carries no CRS
fallback_epsg = {}

[tiling]
; Tile size in pixels
width = {}
height = {}
; Buffer around each region in CRS units (metres for UTM); none disables masking
buffer_radius = {}

[query]
platform = {}
processing_level = {}
; Maximum cloud cover in percent
max_cloud_cover = {}
; Maximum number of catalogue records per region
limit = {}
; Number of scenes processed per region
top_k = {}
; Optional ingestion date range (YYYY-MM-DD, inclusive)
start_date = {}
end_date = {}

[pipeline]
; Regions to process: all, an index (3) or a range (2..5)
regions = {}
; Number of scenes processed in parallel
workers = {}
; Keep downloaded band files after processing
keep_downloads = {}

[logging]
file = {}
"#,
        path_to_string(&config.output.root),
        staging,
        config.output.key_style,
        config.imagery.mode,
        bands,
        config.imagery.band_filter,
        config.imagery.fallback_epsg,
        config.tiling.size.width(),
        config.tiling.size.height(),
        buffer_radius,
        config.query.platform,
        config.query.processing_level,
        config.query.max_cloud_cover,
        config.query.limit,
        config.query.top_k,
        start_date,
        end_date,
        config.pipeline.regions,
        config.pipeline.workers,
        config.pipeline.keep_downloads,
        path_to_string(&config.logging.file),
    )
}

/// Render a path, abbreviating the home directory as `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
