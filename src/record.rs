// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Sensor record data model

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names in canonical wire order
pub const RECORD_FIELDS: [&str; 6] = [
    "recorded",
    "location",
    "sensor",
    "measurement",
    "units",
    "value",
];

const SAMPLE_RECORDED: i64 = 1756655999;
const MIN_TEMPERATURE: f64 = 22.4;
const MAX_TEMPERATURE: f64 = 32.1;

/// A single sensor reading, the unit of persistence.
///
/// Serializes to a flat JSON object with the six fields in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Unix epoch seconds
    pub recorded: i64,
    pub location: String,
    pub sensor: String,
    pub measurement: String,
    pub units: String,
    pub value: f64,
}

impl SensorRecord {
    /// Create a record, rounding `value` to one fractional digit
    pub fn new(
        recorded: i64,
        location: impl Into<String>,
        sensor: impl Into<String>,
        measurement: impl Into<String>,
        units: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            recorded,
            location: location.into(),
            sensor: sensor.into(),
            measurement: measurement.into(),
            units: units.into(),
            value: round_one_digit(value),
        }
    }

    /// The fixed demonstration reading
    pub fn sample() -> Self {
        Self::new(SAMPLE_RECORDED, "den", "bmp280", "temperature", "C", 22.3)
    }

    /// A demonstration reading stamped now with a temperature drawn from
    /// `[22.4, 32.1]`
    pub fn random_reading() -> Self {
        // Low 56 bits of a v4 UUID are uniformly random
        let bits = uuid::Uuid::new_v4().as_u128() as u64 & ((1u64 << 56) - 1);
        let unit = bits as f64 / (1u64 << 56) as f64;
        let value = MIN_TEMPERATURE + unit * (MAX_TEMPERATURE - MIN_TEMPERATURE);

        Self {
            recorded: chrono::Utc::now().timestamp(),
            value: round_one_digit(value),
            ..Self::sample()
        }
    }

    /// Identity used by backends that need a primary key
    pub fn key(&self) -> (i64, &str, &str) {
        (self.recorded, &self.location, &self.sensor)
    }

    /// Parse a record from JSON text.
    ///
    /// All six fields must be present. `recorded` may be an integer or an
    /// integer string, `value` a finite number or a numeric string. `value` is
    /// rounded to one fractional digit, as in [`SensorRecord::new`].
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let parsed: Value = serde_json::from_str(json)
            .map_err(|e| StorageError::MalformedRecord(format!("JSON parse error: {}", e)))?;

        match parsed {
            Value::Object(map) => Self::from_map(&map),
            _ => Err(StorageError::MalformedRecord(
                "record must be a JSON object".to_string(),
            )),
        }
    }

    /// Build a record from an already-parsed JSON object
    pub fn from_map(map: &Map<String, Value>) -> StorageResult<Self> {
        if let Some(missing) = RECORD_FIELDS.iter().find(|f| !map.contains_key(**f)) {
            return Err(StorageError::MalformedRecord(format!(
                "Missing field: {}",
                missing
            )));
        }

        let recorded = map["recorded"]
            .as_i64()
            .or_else(|| map["recorded"].as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| invalid_field("recorded"))?;

        // NaN and infinities have no JSON number form
        let value = map["value"]
            .as_f64()
            .or_else(|| map["value"].as_str().and_then(|s| s.trim().parse().ok()))
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| invalid_field("value"))?;

        Ok(Self::new(
            recorded,
            text_field(map, "location")?,
            text_field(map, "sensor")?,
            text_field(map, "measurement")?,
            text_field(map, "units")?,
            value,
        ))
    }

    /// Canonical flat JSON object
    pub fn to_json(&self) -> String {
        // Plain struct of strings and numbers; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn text_field(map: &Map<String, Value>, field: &str) -> StorageResult<String> {
    map[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid_field(field))
}

fn invalid_field(field: &str) -> StorageError {
    StorageError::MalformedRecord(format!("Missing or invalid '{}' field", field))
}

fn round_one_digit(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
