//! Interactive Map Document
//! Builds a standalone Leaflet page with clustered school markers and the proposed facility.

use crate::data::{Dataset, MeasurementRecord};
use crate::stats::CentroidPoint;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const FACILITY_POPUP: &str = "Proposed Data Center";

/// Awesome-markers color and glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub icon: &'static str,
}

pub const SCHOOL_STYLE: MarkerStyle = MarkerStyle {
    color: "blue",
    icon: "info-sign",
};

pub const FACILITY_STYLE: MarkerStyle = MarkerStyle {
    color: "red",
    icon: "cloud",
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lon: f64,
    pub popup: String,
    pub style: MarkerStyle,
}

/// Map centered on the first centroid, one clustered marker per record.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    pub center: CentroidPoint,
    pub zoom: u8,
    pub schools: Vec<MapMarker>,
    pub facilities: Vec<MapMarker>,
}

impl MapDocument {
    /// `None` when there is nothing to plot.
    pub fn build(dataset: &Dataset, centroids: &[CentroidPoint], zoom: u8) -> Option<Self> {
        if dataset.is_empty() {
            return None;
        }
        let center = *centroids.first()?;

        let schools = dataset
            .records()
            .iter()
            .map(|r| MapMarker {
                lat: r.latitude,
                lon: r.longitude,
                popup: Self::school_popup(r),
                style: SCHOOL_STYLE,
            })
            .collect();

        let facilities = centroids
            .iter()
            .map(|c| MapMarker {
                lat: c.latitude,
                lon: c.longitude,
                popup: FACILITY_POPUP.to_string(),
                style: FACILITY_STYLE,
            })
            .collect();

        Some(Self {
            center,
            zoom,
            schools,
            facilities,
        })
    }

    pub fn school_popup(record: &MeasurementRecord) -> String {
        let name = record
            .school_name
            .as_deref()
            .map(|n| html_escape::encode_text(n).into_owned())
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "School Name: {}<br>Download Speed: {} Mbps<br>Upload Speed: {} Mbps<br>Latency: {} ms",
            name,
            popup_number(record.download_speed),
            popup_number(record.upload_speed),
            popup_number(record.latency)
        )
    }

    /// Render the complete HTML page.
    pub fn to_html(&self) -> serde_json::Result<String> {
        let center = script_json(&[self.center.latitude, self.center.longitude])?;
        let schools = script_json(&self.schools)?;
        let facilities = script_json(&self.facilities)?;

        Ok(MAP_TEMPLATE
            .replace("{{CENTER}}", &center)
            .replace("{{ZOOM}}", &self.zoom.to_string())
            .replace("{{SCHOOLS}}", &schools)
            .replace("{{FACILITIES}}", &facilities))
    }

    /// Write the page to `path`, replacing any previous run's document.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let html = self.to_html()?;
        fs::write(path, html)?;
        info!(path = %path.display(), markers = self.schools.len(), "map saved");
        Ok(())
    }
}

/// JSON safe to inline in a <script> element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

/// Floats keep their decimal point (`2.0`); missing values read `nan`.
fn popup_number(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{:?}", value)
    }
}

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Proposed Data Center</title>

  <!-- Leaflet 1.9.4 -->
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js"></script>

  <!-- Leaflet.markercluster 1.4.1 -->
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.Default.css" />
  <script src="https://unpkg.com/leaflet.markercluster@1.4.1/dist/leaflet.markercluster.js"></script>

  <!-- Awesome markers with glyphicons -->
  <link rel="stylesheet" href="https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css" />
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css" />
  <script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>

  <style>
    html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
    #map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
  </style>
</head>
<body>
  <div id="map"></div>
  <script>
    const center = {{CENTER}};
    const schools = {{SCHOOLS}};
    const facilities = {{FACILITIES}};

    const map = L.map('map').setView(center, {{ZOOM}});
    L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
      maxZoom: 19,
      attribution: '&copy; OpenStreetMap contributors'
    }).addTo(map);

    const icon = (style) => L.AwesomeMarkers.icon({
      icon: style.icon,
      markerColor: style.color,
      iconColor: 'white',
      prefix: 'glyphicon'
    });

    const cluster = L.markerClusterGroup();
    for (const m of schools) {
      L.marker([m.lat, m.lon], {icon: icon(m.style)}).bindPopup(m.popup).addTo(cluster);
    }
    cluster.addTo(map);

    for (const f of facilities) {
      L.marker([f.lat, f.lon], {icon: icon(f.style)}).bindPopup(f.popup).addTo(map);
    }
  </script>
</body>
</html>
"#;
