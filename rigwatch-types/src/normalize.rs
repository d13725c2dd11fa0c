//! Raw endpoint payloads and their normalization.
//!
//! Endpoints are free to omit anything, so every raw field is optional.
//! [`normalize`] then decides what is actually required and reports the
//! first missing path as a [`NormalizationError`].

use serde::{Deserialize, Deserializer};

use crate::{
    classify, format_timestamp_ms, format_unix_seconds, CpuMetrics, Health, MemoryMetrics,
    MetricsSnapshot, NormalizationError, Source, StorageMetrics, SystemInfo, UNKNOWN,
};

/// Candidate names for available memory, in lookup order.
///
/// Older endpoint versions report `free_gb`, newer ones `available_gb`.
pub const MEMORY_AVAILABLE_FIELDS: &[&str] = &["available_gb", "free_gb"];

/// The JSON document returned by a metrics endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    pub hardware: Option<RawHardware>,
    pub system: Option<RawSystem>,
    pub timestamp: Option<RawTimestamp>,
}

/// Endpoint timestamps come either as strings or as Unix seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Text(String),
    UnixSeconds(f64),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHardware {
    pub cpu: Option<RawCpu>,
    pub ram: Option<RawRam>,
    pub storage: Option<RawStorage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCpu {
    pub usage_percent: Option<f64>,
    /// Absent is `None`; an explicit `null` is `Some(None)`. Some hosts cannot
    /// read the clock speed and report null.
    #[serde(default, deserialize_with = "present")]
    pub current_frequency_mhz: Option<Option<f64>>,
    pub physical_cores: Option<f64>,
    pub total_cores: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRam {
    pub usage_percent: Option<f64>,
    pub used_gb: Option<f64>,
    pub total_gb: Option<f64>,
    pub available_gb: Option<f64>,
    pub free_gb: Option<f64>,
}

impl RawRam {
    /// Look up an optional quantity by its wire name.
    fn field(&self, name: &str) -> Option<f64> {
        match name {
            "usage_percent" => self.usage_percent,
            "used_gb" => self.used_gb,
            "total_gb" => self.total_gb,
            "available_gb" => self.available_gb,
            "free_gb" => self.free_gb,
            _ => None,
        }
    }

    /// First present value among [`MEMORY_AVAILABLE_FIELDS`].
    pub fn available(&self) -> Option<f64> {
        MEMORY_AVAILABLE_FIELDS
            .iter()
            .find_map(|name| self.field(name))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStorage {
    pub usage_percent: Option<f64>,
    pub used_gb: Option<f64>,
    pub free_gb: Option<f64>,
    pub total_gb: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSystem {
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub architecture: Option<String>,
    pub processor: Option<String>,
}

/// Convert a raw payload into the canonical record for `source`.
///
/// `fetched_at_ms` is used for `captured_at` when the payload carries no
/// timestamp. Percentages are clamped to `[0, 100]`; other quantities are
/// floored at zero. Health is derived with [`classify`].
pub fn normalize(
    raw: &RawPayload,
    source: &Source,
    fetched_at_ms: u64,
) -> Result<MetricsSnapshot, NormalizationError> {
    let hardware = section(raw.hardware.as_ref(), "hardware")?;
    let cpu = section(hardware.cpu.as_ref(), "hardware.cpu")?;
    let ram = section(hardware.ram.as_ref(), "hardware.ram")?;
    let storage = section(hardware.storage.as_ref(), "hardware.storage")?;
    let system = section(raw.system.as_ref(), "system")?;

    let cpu = CpuMetrics {
        usage_percent: percent(required(cpu.usage_percent, "hardware.cpu.usage_percent")?),
        current_frequency_mhz: non_negative(
            cpu.current_frequency_mhz
                .ok_or(NormalizationError::MissingField(
                    "hardware.cpu.current_frequency_mhz",
                ))?
                .unwrap_or(0.0),
        ),
        physical_cores: count(required(cpu.physical_cores, "hardware.cpu.physical_cores")?),
        logical_cores: count(required(cpu.total_cores, "hardware.cpu.total_cores")?),
    };

    let used_gb = non_negative(required(ram.used_gb, "hardware.ram.used_gb")?);
    let total_gb = non_negative(required(ram.total_gb, "hardware.ram.total_gb")?);
    let memory = MemoryMetrics {
        usage_percent: percent(required(ram.usage_percent, "hardware.ram.usage_percent")?),
        used_gb,
        total_gb,
        available_gb: ram
            .available()
            .map(non_negative)
            .unwrap_or_else(|| non_negative(total_gb - used_gb)),
    };

    let storage = StorageMetrics {
        usage_percent: percent(required(
            storage.usage_percent,
            "hardware.storage.usage_percent",
        )?),
        used_gb: non_negative(required(storage.used_gb, "hardware.storage.used_gb")?),
        free_gb: non_negative(required(storage.free_gb, "hardware.storage.free_gb")?),
        total_gb: non_negative(required(storage.total_gb, "hardware.storage.total_gb")?),
    };

    let system = SystemInfo {
        os: text(&system.os),
        os_version: text(&system.os_version),
        architecture: text(&system.architecture),
        processor: text(&system.processor),
    };

    let captured_at = match &raw.timestamp {
        Some(RawTimestamp::Text(ts)) if !ts.trim().is_empty() => ts.clone(),
        Some(RawTimestamp::UnixSeconds(secs)) => format_unix_seconds(*secs),
        _ => format_timestamp_ms(fetched_at_ms),
    };

    let mut snapshot = MetricsSnapshot {
        source_id: source.id,
        source_name: source.name.clone(),
        cpu,
        memory,
        storage,
        system,
        captured_at,
        health: Health::Healthy,
        fetch_error: None,
    };
    snapshot.health = classify(snapshot.usage());
    Ok(snapshot)
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

fn section<'a, T>(value: Option<&'a T>, path: &'static str) -> Result<&'a T, NormalizationError> {
    value.ok_or(NormalizationError::MissingField(path))
}

fn required(value: Option<f64>, path: &'static str) -> Result<f64, NormalizationError> {
    value.ok_or(NormalizationError::MissingField(path))
}

/// Clamp to `[0, 100]`; NaN becomes 0.
pub fn percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Floor at 0; NaN becomes 0.
pub fn non_negative(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}

fn count(value: f64) -> u32 {
    non_negative(value).round() as u32
}

fn text(value: &Option<String>) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s.clone(),
        _ => UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn payload() -> Value {
        json!({
            "hardware": {
                "cpu": {
                    "usage_percent": 35.5,
                    "current_frequency_mhz": 3200.0,
                    "physical_cores": 8,
                    "total_cores": 16
                },
                "ram": {
                    "usage_percent": 50.0,
                    "used_gb": 16.0,
                    "total_gb": 32.0,
                    "available_gb": 15.5
                },
                "storage": {
                    "usage_percent": 60.0,
                    "used_gb": 300.0,
                    "free_gb": 200.0,
                    "total_gb": 500.0
                }
            },
            "system": {
                "os": "Linux",
                "os_version": "6.8.0",
                "architecture": "x86_64",
                "processor": "AMD Ryzen 7"
            },
            "timestamp": "2024-05-01T10:00:00.123456"
        })
    }

    fn source() -> Source {
        Source::new(1, "Web Server 1", "http://localhost:5001/api/system")
    }

    fn parse(value: Value) -> RawPayload {
        serde_json::from_value(value).unwrap()
    }

    fn remove(value: &mut Value, path: &str) {
        let mut parts: Vec<&str> = path.split('.').collect();
        let last = parts.pop().unwrap();
        let mut cursor = value;
        for part in parts {
            cursor = cursor.get_mut(part).unwrap();
        }
        cursor.as_object_mut().unwrap().remove(last);
    }

    #[test]
    fn normalizes_complete_payload() {
        let snapshot = normalize(&parse(payload()), &source(), 0).unwrap();

        assert_eq!(snapshot.source_id, 1);
        assert_eq!(snapshot.source_name, "Web Server 1");
        assert_eq!(snapshot.cpu.usage_percent, 35.5);
        assert_eq!(snapshot.cpu.current_frequency_mhz, 3200.0);
        assert_eq!(snapshot.cpu.physical_cores, 8);
        assert_eq!(snapshot.cpu.logical_cores, 16);
        assert_eq!(snapshot.memory.available_gb, 15.5);
        assert_eq!(snapshot.storage.free_gb, 200.0);
        assert_eq!(snapshot.system.processor, "AMD Ryzen 7");
        assert_eq!(snapshot.captured_at, "2024-05-01T10:00:00.123456");
        assert_eq!(snapshot.health, Health::Healthy);
        assert!(snapshot.is_ok());
    }

    #[test]
    fn reserializing_preserves_numeric_fields() {
        let input = payload();
        let snapshot = normalize(&parse(input.clone()), &source(), 0).unwrap();
        let out = serde_json::to_value(&snapshot).unwrap();

        let hw = &input["hardware"];
        assert_eq!(out["cpu"]["usage_percent"], hw["cpu"]["usage_percent"]);
        assert_eq!(
            out["cpu"]["current_frequency_mhz"],
            hw["cpu"]["current_frequency_mhz"]
        );
        assert_eq!(out["cpu"]["physical_cores"], hw["cpu"]["physical_cores"]);
        assert_eq!(out["cpu"]["logical_cores"], hw["cpu"]["total_cores"]);
        for field in ["usage_percent", "used_gb", "total_gb", "available_gb"] {
            assert_eq!(out["memory"][field], hw["ram"][field], "memory.{field}");
        }
        for field in ["usage_percent", "used_gb", "free_gb", "total_gb"] {
            assert_eq!(out["storage"][field], hw["storage"][field], "storage.{field}");
        }
    }

    #[test]
    fn every_required_field_is_enforced() {
        let required = [
            "hardware",
            "hardware.cpu",
            "hardware.ram",
            "hardware.storage",
            "system",
            "hardware.cpu.usage_percent",
            "hardware.cpu.current_frequency_mhz",
            "hardware.cpu.physical_cores",
            "hardware.cpu.total_cores",
            "hardware.ram.usage_percent",
            "hardware.ram.used_gb",
            "hardware.ram.total_gb",
            "hardware.storage.usage_percent",
            "hardware.storage.used_gb",
            "hardware.storage.free_gb",
            "hardware.storage.total_gb",
        ];

        for path in required {
            let mut value = payload();
            remove(&mut value, path);
            let err = normalize(&parse(value), &source(), 0).unwrap_err();
            assert_eq!(err, NormalizationError::MissingField(path));
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let mut value = payload();
        value["hardware"]["cpu"]["usage_percent"] = Value::Null;
        let err = normalize(&parse(value), &source(), 0).unwrap_err();
        assert_eq!(err, NormalizationError::MissingField("hardware.cpu.usage_percent"));
    }

    #[test]
    fn null_frequency_reads_as_zero() {
        let mut value = payload();
        value["hardware"]["cpu"]["current_frequency_mhz"] = Value::Null;

        let snapshot = normalize(&parse(value), &source(), 0).unwrap();
        assert_eq!(snapshot.cpu.current_frequency_mhz, 0.0);
        assert!(snapshot.is_ok());
        assert_eq!(snapshot.health, Health::Healthy);
    }

    #[test]
    fn accepts_free_gb_for_available_memory() {
        let mut value = payload();
        remove(&mut value, "hardware.ram.available_gb");
        value["hardware"]["ram"]["free_gb"] = json!(7.25);

        let snapshot = normalize(&parse(value), &source(), 0).unwrap();
        assert_eq!(snapshot.memory.available_gb, 7.25);
    }

    #[test]
    fn available_gb_wins_over_free_gb() {
        let mut value = payload();
        value["hardware"]["ram"]["free_gb"] = json!(1.0);

        let snapshot = normalize(&parse(value), &source(), 0).unwrap();
        assert_eq!(snapshot.memory.available_gb, 15.5);
    }

    #[test]
    fn derives_available_memory_when_absent() {
        let mut value = payload();
        remove(&mut value, "hardware.ram.available_gb");

        let snapshot = normalize(&parse(value), &source(), 0).unwrap();
        assert_eq!(snapshot.memory.available_gb, 16.0);
    }

    #[test]
    fn clamps_percentages_and_negatives() {
        let mut value = payload();
        value["hardware"]["cpu"]["usage_percent"] = json!(140.0);
        value["hardware"]["ram"]["usage_percent"] = json!(-3.0);
        value["hardware"]["storage"]["used_gb"] = json!(-1.0);
        value["hardware"]["cpu"]["physical_cores"] = json!(-2);

        let snapshot = normalize(&parse(value), &source(), 0).unwrap();
        assert_eq!(snapshot.cpu.usage_percent, 100.0);
        assert_eq!(snapshot.memory.usage_percent, 0.0);
        assert_eq!(snapshot.storage.used_gb, 0.0);
        assert_eq!(snapshot.cpu.physical_cores, 0);
        assert_eq!(snapshot.health, Health::Critical);
    }

    #[test]
    fn nan_becomes_zero() {
        assert_eq!(percent(f64::NAN), 0.0);
        assert_eq!(non_negative(f64::NAN), 0.0);
        assert_eq!(percent(55.0), 55.0);
    }

    #[test]
    fn missing_identity_defaults_to_unknown() {
        let mut value = payload();
        value["system"] = json!({"os": "", "architecture": "arm64"});

        let snapshot = normalize(&parse(value), &source(), 0).unwrap();
        assert_eq!(snapshot.system.os, UNKNOWN);
        assert_eq!(snapshot.system.os_version, UNKNOWN);
        assert_eq!(snapshot.system.architecture, "arm64");
        assert_eq!(snapshot.system.processor, UNKNOWN);
    }

    #[test]
    fn timestamp_falls_back_to_fetch_time() {
        let mut value = payload();
        remove(&mut value, "timestamp");

        let snapshot = normalize(&parse(value), &source(), 1_700_000_000_000).unwrap();
        assert_eq!(snapshot.captured_at, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn numeric_timestamp_is_unix_seconds() {
        let mut value = payload();
        value["timestamp"] = json!(1_700_000_000);

        let snapshot = normalize(&parse(value), &source(), 0).unwrap();
        assert_eq!(snapshot.captured_at, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn health_follows_usage() {
        for (cpu, expected) in [
            (50.0, Health::Healthy),
            (80.0, Health::Warning),
            (95.0, Health::Critical),
        ] {
            let mut value = payload();
            value["hardware"]["cpu"]["usage_percent"] = json!(cpu);
            let snapshot = normalize(&parse(value), &source(), 0).unwrap();
            assert_eq!(snapshot.health, expected, "cpu {cpu}");
        }
    }

    #[test]
    fn wrong_type_fails_to_parse() {
        let mut value = payload();
        value["hardware"]["cpu"]["usage_percent"] = json!("high");
        assert!(serde_json::from_value::<RawPayload>(value).is_err());
    }
}
