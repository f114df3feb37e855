use crate::annotations::point::{GeoPoint, Point};
use serde::{Deserialize, Deserializer, Serialize};

/// One row of the result document.
///
/// Each detected box of an image becomes its own record, and an image without boxes gets a
/// single negative record. Geographic and score fields are filled only for target detections.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub name: String,
    #[serde(deserialize_with = "yes_no_or_bool")]
    pub mine_detected: bool,
    #[serde(deserialize_with = "yes_no_or_bool")]
    pub mine_present: bool,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub prob: Option<f64>,
    pub conf: Option<f64>,
    /// Why `lat`/`lon` are missing on a detected record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_error: Option<String>,
}

impl DetectionRecord {
    /// A record without a target detection.
    pub fn negative(name: impl Into<String>, mine_present: bool) -> Self {
        DetectionRecord {
            name: name.into(),
            mine_detected: false,
            mine_present,
            x: None,
            y: None,
            lat: None,
            lon: None,
            prob: None,
            conf: None,
            geo_error: None,
        }
    }

    /// A target detection placed on the map.
    pub fn geolocated(
        name: impl Into<String>,
        mine_present: bool,
        pixel: Point,
        position: GeoPoint,
        confidence: f64,
    ) -> Self {
        DetectionRecord {
            name: name.into(),
            mine_detected: true,
            mine_present,
            x: Some(pixel.x),
            y: Some(pixel.y),
            lat: Some(position.lat),
            lon: Some(position.lon),
            prob: Some(confidence * 100.0),
            conf: Some(confidence),
            geo_error: None,
        }
    }

    /// A target detection whose image could not be georeferenced.
    pub fn ungeolocated(
        name: impl Into<String>,
        mine_present: bool,
        pixel: Point,
        confidence: f64,
        geo_error: impl Into<String>,
    ) -> Self {
        DetectionRecord {
            name: name.into(),
            mine_detected: true,
            mine_present,
            x: Some(pixel.x),
            y: Some(pixel.y),
            lat: None,
            lon: None,
            prob: Some(confidence * 100.0),
            conf: Some(confidence),
            geo_error: Some(geo_error.into()),
        }
    }

    pub fn position(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => None,
        }
    }

    pub fn is_geocoded(&self) -> bool {
        self.mine_detected && self.position().is_some()
    }

    /// JSON has no NaN or infinity, so a record holding one would not load back as saved.
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.lat, self.lon, self.prob, self.conf]
            .into_iter()
            .flatten()
            .all(f64::is_finite)
    }
}

/// Older result documents spell booleans as `"yes"` / `"no"`.
fn yes_no_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.as_str() {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected \"yes\" or \"no\", found {other:?}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detected_records_carry_every_score_field() {
        let record = DetectionRecord::geolocated(
            "a.tiff",
            true,
            Point { x: 3.0, y: 4.0 },
            GeoPoint { lat: 48.0, lon: 2.0 },
            0.9,
        );
        assert!(record.is_geocoded());
        assert_eq!(record.prob, Some(90.0));
        assert_eq!(record.conf, Some(0.9));

        let negative = DetectionRecord::negative("b.tiff", false);
        assert!(!negative.is_geocoded());
        assert_eq!((negative.lat, negative.lon, negative.prob, negative.conf), (None, None, None, None));
    }

    #[test]
    fn reads_legacy_yes_no_flags() {
        let json = r#"{
            "name": "a.tiff", "mine_detected": "yes", "mine_present": "no",
            "x": 1.0, "y": 2.0, "lat": 3.0, "lon": 4.0, "prob": 50.0, "conf": 0.5
        }"#;
        let record: DetectionRecord = serde_json::from_str(json).unwrap();
        assert!(record.mine_detected);
        assert!(!record.mine_present);
        assert_eq!(record.geo_error, None);
    }

    #[test]
    fn rejects_unknown_flag_text() {
        let json = r#"{
            "name": "a.tiff", "mine_detected": "maybe", "mine_present": false,
            "x": null, "y": null, "lat": null, "lon": null, "prob": null, "conf": null
        }"#;
        assert!(serde_json::from_str::<DetectionRecord>(json).is_err());
    }

    #[test]
    fn geo_error_is_omitted_when_absent() {
        let json = serde_json::to_string(&DetectionRecord::negative("b.tiff", true)).unwrap();
        assert_eq!(
            json,
            r#"{"name":"b.tiff","mine_detected":false,"mine_present":true,"x":null,"y":null,"lat":null,"lon":null,"prob":null,"conf":null}"#
        );
    }
}
