use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::model::{
    Feature, FeatureCollection, PROP_CRIME_TYPE, PROP_LOCATION, PROP_MONTH, PROP_OUTCOME,
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Dataset source
// ---------------------------------------------------------------------------

/// Where a feature collection comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// GeoJSON endpoint authenticated with an `access_token` query parameter.
    Remote { url: String, access_token: String },
    /// Local `.geojson` / `.json` / `.csv` file.
    File(PathBuf),
}

impl DatasetSource {
    /// Load the full collection. Blocking; call from a worker thread.
    pub fn load(&self) -> Result<FeatureCollection> {
        match self {
            DatasetSource::Remote { url, access_token } => fetch_remote(url, access_token),
            DatasetSource::File(path) => load_file(path),
        }
    }
}

impl fmt::Display for DatasetSource {
    /// Never prints the access token.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Remote { url, .. } => write!(f, "{url}"),
            DatasetSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote fetch
// ---------------------------------------------------------------------------

fn fetch_remote(url: &str, access_token: &str) -> Result<FeatureCollection> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("building HTTP client")?;

    let mut request = client.get(url).header("Accept", "application/json");
    if !access_token.is_empty() {
        request = request.query(&[("access_token", access_token)]);
    }

    let response = request
        .send()
        .with_context(|| format!("requesting {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("dataset endpoint returned {status}");
    }

    let text = response.text().context("reading response body")?;
    parse_geojson(&text)
}

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

/// Load a crime dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.geojson` / `.json` – a GeoJSON `FeatureCollection` of Point features
/// * `.csv`               – a police.uk street-crime export
pub fn load_file(path: &Path) -> Result<FeatureCollection> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "geojson" | "json" => {
            let text = std::fs::read_to_string(path).context("reading GeoJSON file")?;
            parse_geojson(&text)
        }
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            parse_police_csv(file)
        }
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// GeoJSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<JsonValue>,
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<JsonMap<String, JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Vec<JsonValue>,
}

/// Parse a GeoJSON `FeatureCollection`.
///
/// Features without a Point geometry, a `Crime type` or a `Month` are skipped.
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let raw: RawCollection = serde_json::from_str(text).context("parsing GeoJSON")?;
    if raw.kind != "FeatureCollection" {
        bail!("Expected a FeatureCollection, got {:?}", raw.kind);
    }

    let total = raw.features.len();
    let features: Vec<Feature> = raw
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(i, f)| {
            let converted = convert_feature(f);
            if converted.is_none() {
                log::debug!("Skipping feature {i}: not a crime point");
            }
            converted
        })
        .collect();

    warn_skipped(total, features.len());
    Ok(FeatureCollection::new(features))
}

fn convert_feature(raw: RawFeature) -> Option<Feature> {
    let geometry = raw.geometry?;
    if geometry.kind != "Point" || geometry.coordinates.len() < 2 {
        return None;
    }
    let lon = geometry.coordinates[0].as_f64()?;
    let lat = geometry.coordinates[1].as_f64()?;
    if !is_valid_position(lon, lat) {
        return None;
    }

    let props = raw.properties?;
    let text = |key: &str| props.get(key).and_then(JsonValue::as_str).map(str::to_string);

    Some(Feature {
        id: raw.id.map(|id| match id {
            JsonValue::String(s) => s,
            other => other.to_string(),
        }),
        lon,
        lat,
        crime_type: text(PROP_CRIME_TYPE)?,
        month: text(PROP_MONTH)?,
        location: text(PROP_LOCATION).unwrap_or_default(),
        outcome: text(PROP_OUTCOME).filter(|s| !s.is_empty()),
    })
}

// ---------------------------------------------------------------------------
// police.uk CSV
// ---------------------------------------------------------------------------

/// One row of a police.uk `*-street.csv` export. Unused columns are ignored.
#[derive(Debug, Deserialize)]
struct PoliceRow {
    #[serde(rename = "Crime ID", default)]
    crime_id: Option<String>,
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "Longitude", deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(rename = "Latitude", deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(rename = "Location", default)]
    location: String,
    #[serde(rename = "Crime type")]
    crime_type: String,
    #[serde(rename = "Last outcome category", default)]
    outcome: Option<String>,
}

/// Parse a police.uk street-crime CSV. Rows without coordinates are skipped.
pub fn parse_police_csv<R: Read>(input: R) -> Result<FeatureCollection> {
    let mut reader = csv::Reader::from_reader(input);
    let mut features = Vec::new();
    let mut total = 0;

    for (row_no, result) in reader.deserialize::<PoliceRow>().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        total += 1;

        let (Some(lon), Some(lat)) = (row.longitude, row.latitude) else {
            continue;
        };
        if !is_valid_position(lon, lat) {
            continue;
        }

        features.push(Feature {
            id: row.crime_id.filter(|s| !s.is_empty()),
            lon,
            lat,
            crime_type: row.crime_type,
            month: row.month,
            location: row.location,
            outcome: row.outcome.filter(|s| !s.is_empty()),
        });
    }

    warn_skipped(total, features.len());
    Ok(FeatureCollection::new(features))
}

fn is_valid_position(lon: f64, lat: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)
}

fn warn_skipped(total: usize, kept: usize) {
    if kept < total {
        log::warn!("Skipped {} of {total} records without usable location or type", total - kept);
    }
}
