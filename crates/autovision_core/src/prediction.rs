//! Payload returned by the prediction service.
//!
//! Parsing is intentionally shallow: the shape is enforced, the ranges are
//! not. The report renderer deals with odd values.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identification plus engine specifications for one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Underscore-joined make/model/body tokens, e.g. `Audi_A4_Sedan_2012`.
    #[serde(alias = "car")]
    pub subject: String,
    pub year: YearValue,
    pub confidence: AxisConfidence,
    #[serde(alias = "engine")]
    pub specifications: Specifications,
    /// Set by the service when specification inference failed but the
    /// identification itself succeeded.
    #[serde(rename = "llm error", default, skip_serializing_if = "Option::is_none")]
    pub inference_note: Option<String>,
}

impl PredictionResult {
    /// Parse a raw response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// The two independent identification scores, each in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfidence {
    pub model: f64,
    pub year: f64,
}

/// Display year; the service sends either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for YearValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearValue::Number(n) => write!(f, "{n}"),
            YearValue::Text(s) => f.write_str(s),
        }
    }
}

/// One specification as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecEntry {
    pub value: SpecValue,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Magnitude of a specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
    Number(f64),
    Text(String),
    /// Anything else the service sends (booleans, nulls, lists).
    Other(serde_json::Value),
}

impl SpecValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SpecValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Specification entries in the order the payload lists them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specifications(Vec<(String, SpecEntry)>);

impl Specifications {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpecEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SpecEntry> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl FromIterator<(String, SpecEntry)> for Specifications {
    fn from_iter<I: IntoIterator<Item = (String, SpecEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for Specifications {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Specifications;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of specification entries")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, SpecEntry)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, entry)) = map.next_entry::<String, SpecEntry>()? {
                    // a repeated key replaces the earlier value in place
                    if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                        slot.1 = entry;
                    } else {
                        entries.push((key, entry));
                    }
                }
                Ok(Specifications(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

impl Serialize for Specifications {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_BODY: &str = r#"{
        "car": "Audi_A4_Sedan_2012",
        "year": 2012,
        "confidence": { "model": 0.92, "year": 0.81 },
        "engine": {
            "displacement": { "value": 1984, "source": "CompCars", "confidence": 1.0 },
            "bhp": { "value": 208, "source": "Gemma", "confidence": 0.85 },
            "aspiration": { "value": "Turbocharged", "confidence": 0.7 }
        }
    }"#;

    #[test]
    fn parses_reference_backend_keys() {
        let parsed = PredictionResult::from_slice(REFERENCE_BODY.as_bytes()).unwrap();
        assert_eq!(parsed.subject, "Audi_A4_Sedan_2012");
        assert_eq!(parsed.year, YearValue::Number(2012));
        assert_eq!(parsed.confidence.model, 0.92);
        assert_eq!(parsed.specifications.len(), 3);
        assert!(parsed.inference_note.is_none());
        let aspiration = parsed.specifications.get("aspiration").unwrap();
        assert_eq!(aspiration.value, SpecValue::Text("Turbocharged".into()));
        assert_eq!(aspiration.source, None);
    }

    #[test]
    fn keeps_payload_order_instead_of_sorting() {
        let body = r#"{
            "subject": "Tesla_Model_S",
            "year": "2015",
            "confidence": { "model": 0.5, "year": 0.5 },
            "specifications": {
                "seats": { "value": 5, "confidence": 0.9 },
                "bhp": { "value": 300, "confidence": 0.6 },
                "acceleration": { "value": 4.2, "confidence": 0.6 }
            }
        }"#;
        let parsed = PredictionResult::from_slice(body.as_bytes()).unwrap();
        let keys: Vec<&str> = parsed.specifications.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["seats", "bhp", "acceleration"]);
        assert_eq!(parsed.year.to_string(), "2015");
    }

    #[test]
    fn carries_inference_note_and_odd_values() {
        let body = r#"{
            "car": "Bmw_X5_Suv",
            "year": 2010,
            "confidence": { "model": 0.4, "year": 0.3 },
            "engine": { "hybrid": { "value": true, "confidence": 0.2 } },
            "llm error": "connection refused"
        }"#;
        let parsed = PredictionResult::from_slice(body.as_bytes()).unwrap();
        assert_eq!(parsed.inference_note.as_deref(), Some("connection refused"));
        let hybrid = parsed.specifications.get("hybrid").unwrap();
        assert_eq!(hybrid.value, SpecValue::Other(serde_json::Value::Bool(true)));
    }

    #[test]
    fn rejects_missing_specifications() {
        let body = r#"{ "car": "X", "year": 1, "confidence": { "model": 1, "year": 1 } }"#;
        assert!(PredictionResult::from_slice(body.as_bytes()).is_err());
    }

    #[test]
    fn rejects_non_json() {
        assert!(PredictionResult::from_slice(b"<html>502</html>").is_err());
    }
}
