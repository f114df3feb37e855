use crate::annotations::point::GeoPoint;
use crate::evaluation::detection_record::DetectionRecord;
use log::info;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Paris, where the survey imagery is georeferenced.
pub const DEFAULT_MAP_CENTER: GeoPoint = GeoPoint { lat: 48.8566, lon: 2.3522 };
pub const DEFAULT_MAP_ZOOM: u8 = 12;

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Detected mines</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
const markers = __MARKERS__;
const map = L.map("map").setView([__CENTER_LAT__, __CENTER_LON__], __ZOOM__);
L.tileLayer("https://tile.openstreetmap.org/{z}/{x}/{y}.png", {
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}).addTo(map);
for (const marker of markers) {
  L.circleMarker([marker.lat, marker.lon], { color: "red", fillOpacity: 0.8, radius: 8 })
    .bindPopup(marker.popup)
    .addTo(map);
}
</script>
</body>
</html>
"#;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("Failed to encode map markers: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to write map {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lon: f64,
    /// HTML shown when the marker is clicked.
    pub popup: String,
}

impl MapMarker {
    fn for_record(record: &DetectionRecord, position: GeoPoint) -> Self {
        let score = |value: Option<f64>| value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
        let popup = format!(
            "<strong>Image:</strong> {}<br><strong>Probability:</strong> {}<br><strong>Confidence:</strong> {}",
            escape_html(&record.name),
            score(record.prob),
            score(record.conf),
        );
        MapMarker { lat: position.lat, lon: position.lon, popup }
    }
}

/// A web map with one marker per geolocated detection.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionMap {
    center: GeoPoint,
    zoom: u8,
    markers: Vec<MapMarker>,
}

impl Default for DetectionMap {
    fn default() -> Self {
        DetectionMap::new(DEFAULT_MAP_CENTER, DEFAULT_MAP_ZOOM)
    }
}

impl DetectionMap {
    pub fn new(center: GeoPoint, zoom: u8) -> Self {
        DetectionMap { center, zoom, markers: Vec::new() }
    }

    /// Adds a marker for every detected record that has coordinates.
    pub fn add_records(&mut self, records: &[DetectionRecord]) {
        for record in records.iter().filter(|r| r.mine_detected) {
            if let Some(position) = record.position() {
                self.markers.push(MapMarker::for_record(record, position));
            }
        }
    }

    pub fn markers(&self) -> &[MapMarker] {
        &self.markers
    }

    pub fn render(&self) -> Result<String, MapError> {
        // "</" inside the script block would end it early.
        let markers = serde_json::to_string(&self.markers)?.replace("</", "<\\/");
        // Markers go in last so placeholder text inside popups is left as written.
        Ok(MAP_TEMPLATE
            .replace("__CENTER_LAT__", &self.center.lat.to_string())
            .replace("__CENTER_LON__", &self.center.lon.to_string())
            .replace("__ZOOM__", &self.zoom.to_string())
            .replace("__MARKERS__", &markers))
    }

    pub fn save(&self, path: &Path) -> Result<(), MapError> {
        let html = self.render()?;
        fs::write(path, html).map_err(|source| MapError::Io { path: path.to_path_buf(), source })?;
        info!("Map with {} detected mines saved to {}", self.markers.len(), path.display());
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
