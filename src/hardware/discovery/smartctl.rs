//! smartctl Output Parser
//!
//! Turns the free-text output of `smartctl --xall --format=old` for one device
//! into a typed [`Disk`] record and a map of named SMART metrics.
//!
//! # Extraction policy
//!
//! Fields are pulled out by an ordered table of `(field, pattern)` rules.
//! Lines are visited top to bottom and every rule is tried on every line;
//! a match overwrites whatever the field held before. The effective rule is
//! therefore *last match wins*: a field keeps its first match only if no
//! later line matches again. On a single line, a later rule for the same
//! field beats an earlier one. Fields that never match stay empty.
//!
//! Parsing never fails. Callers get whatever subset could be extracted.

use crate::hardware::classification::DiskClassifier;
use crate::hardware::discovery::header::DiskHeader;
use crate::hardware::disk::{normalize_wwn, Disk};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// =============================================================================
// Ordered Field Rules
// =============================================================================

/// One extraction rule: the first capture group of `pattern` feeds `field`
#[derive(Debug, Clone)]
pub struct FieldRule<F> {
    pub field: F,
    pub pattern: Regex,
}

impl<F> FieldRule<F> {
    pub fn new(field: F, pattern: Regex) -> Self {
        Self { field, pattern }
    }
}

/// Values extracted by [`extract_fields`]
#[derive(Debug, Clone)]
pub struct FieldValues<F: Eq + Hash> {
    values: HashMap<F, String>,
}

impl<F: Eq + Hash> FieldValues<F> {
    /// Extracted value, empty when the field never matched
    pub fn get(&self, field: &F) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or_default()
    }

    pub fn contains(&self, field: &F) -> bool {
        self.values.contains_key(field)
    }

    /// Move a value out, leaving nothing behind
    pub fn take(&mut self, field: &F) -> String {
        self.values.remove(field).unwrap_or_default()
    }
}

/// Apply an ordered rule table to `text` with last-match-wins semantics
pub fn extract_fields<F: Copy + Eq + Hash>(text: &str, rules: &[FieldRule<F>]) -> FieldValues<F> {
    let mut values = HashMap::new();
    for line in text.lines() {
        for rule in rules {
            if let Some(caps) = rule.pattern.captures(line) {
                if let Some(value) = caps.get(1) {
                    values.insert(rule.field, value.as_str().to_string());
                }
            }
        }
    }
    FieldValues { values }
}

// =============================================================================
// Disk Field Table
// =============================================================================

/// Disk attributes pulled from the information section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiskField {
    FirmwareVersion,
    Model,
    SataVersion,
    SectorSize,
    RotationRate,
    Wwn,
    SerialNumber,
    Size,
    CapacityBytes,
    SmartHealthStatus,
    Vendor,
    TransportProtocol,
    PeripheralDeviceType,
}

fn rule<F>(field: F, pattern: &str) -> FieldRule<F> {
    FieldRule::new(field, Regex::new(pattern).unwrap())
}

/// ATA rules come before their SCSI counterparts for each field
static DISK_FIELD_RULES: Lazy<Vec<FieldRule<DiskField>>> = Lazy::new(|| {
    use DiskField::*;
    vec![
        rule(FirmwareVersion, r"^Firmware Version:\s+(.*)$"),
        rule(FirmwareVersion, r"^Revision:\s+(.*)$"),
        rule(Model, r"^Device Model:\s+(.*)$"),
        rule(Model, r"^Product:\s+(.*)$"),
        rule(SataVersion, r"^SATA Version is:\s+(.*)$"),
        rule(SectorSize, r"^Sector Sizes?:\s+(.*)$"),
        rule(SectorSize, r"^Logical block size:\s+(.*)$"),
        rule(RotationRate, r"^Rotation Rate:\s+(.*)$"),
        rule(Wwn, r"^LU WWN Device Id:\s+(.*)$"),
        rule(Wwn, r"^Logical Unit id:\s+0x(.*)$"),
        rule(SerialNumber, r"^Serial [nN]umber:\s+(.*)$"),
        rule(Size, r"^User Capacity:\s+[0-9,]+\s+bytes\s+\[(.*)\]$"),
        rule(CapacityBytes, r"^User Capacity:\s+([0-9,]+)\s+bytes"),
        rule(SmartHealthStatus, r"^SMART overall-health self-assessment test result:\s+(\w+).*$"),
        rule(SmartHealthStatus, r"^SMART Health Status:\s+(\w+).*$"),
        rule(Vendor, r"^Model Family:\s+(.*)$"),
        rule(Vendor, r"^Vendor:\s+(.*)$"),
        rule(TransportProtocol, r"^Transport protocol:\s+(.*)$"),
        rule(PeripheralDeviceType, r"^Device type:\s+(.*)$"),
    ]
});

// =============================================================================
// SMART Metric Patterns
// =============================================================================

static CURRENT_TEMPERATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Current.+Temperature:\s+([0-9]+).*$").unwrap());
static TRIP_TEMPERATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Drive Trip Temperature:\s+([0-9]+).*$").unwrap());
static GROWN_DEFECT_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Elements in grown defect list:\s+([0-9]+)$").unwrap());

// Two phrasings across smartctl releases
static POWER_ON_HOURS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"^\s*Accumulated power on time,\shours:minutes\s([0-9]+):[0-9]+\s.[0-9]+\sminutes.*$")
            .unwrap(),
        Regex::new(r"^\s*number of hours powered up\s*=\s*([0-9]+)[.0-9]*$").unwrap(),
    ]
});

// ID# ATTRIBUTE_NAME FLAG VALUE WORST THRESH TYPE UPDATED WHEN_FAILED RAW_VALUE
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*([0-9]+)\s+\S+\s+0x[0-9a-z]+\s+[0-9]+\s+[0-9]+\s+[0-9]+\s+\S+\s+\w+\s+[-\w]+\s+([\w\+\.]+).*$",
    )
    .unwrap()
});

// read:    397365        0         0    397365     397365         78.328           0
static ERROR_COUNTER_LOG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\w+)\W\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)\s+([0-9.]+)\s+([0-9]+)$",
    )
    .unwrap()
});

// Only seconds carry a fraction
static DURATION_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)(h|m|(?:\.[0-9]*)?s)$").unwrap());

/// Metric name prefixes for the seven error-counter columns, in column order
const ERROR_COUNTER_COLUMNS: [&str; 7] = [
    "ErrorsCorrectedbyECCFast",
    "ErrorsCorrectedbyECCDelayed",
    "ErrorCorrectedByRereadsRewrites",
    "TotalErrorsCorrected",
    "CorrectionAlgorithmInvocations",
    "GigaBytesProcessed",
    "TotalUncorrectedErrors",
];

/// Column holding a float rather than an integer
const ERROR_COUNTER_FLOAT_COLUMN: usize = 5;

// =============================================================================
// SMART Metrics
// =============================================================================

/// Numeric value of one SMART metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Integer(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Named SMART metrics of one device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartMetrics {
    /// Normalized WWN seen in the same output, empty if none
    pub wwn: String,
    pub values: BTreeMap<String, MetricValue>,
}

impl SmartMetrics {
    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.values.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    fn insert_int(&mut self, name: impl Into<String>, raw: &str) {
        if let Ok(value) = raw.parse::<i64>() {
            self.values.insert(name.into(), MetricValue::Integer(value));
        }
    }
}

/// Parse a SMART raw value: a plain integer, or a `+`-joined duration such
/// as `65h+33m+09.259s` summed to whole seconds. Anything else yields `None`.
pub fn parse_raw_value(raw: &str) -> Option<i64> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }

    let mut seconds = 0i64;
    for part in raw.split('+') {
        let caps = DURATION_PART.captures(part)?;
        let amount: i64 = caps[1].parse().ok()?;
        let scale = match &caps[2] {
            "h" => 3600,
            "m" => 60,
            _ => 1,
        };
        seconds = seconds.checked_add(amount.checked_mul(scale)?)?;
    }
    Some(seconds)
}

// =============================================================================
// Parser
// =============================================================================

/// Parser for smartctl diagnostic output
#[derive(Debug, Clone, Default)]
pub struct SmartctlParser {
    classifier: DiskClassifier,
}

impl SmartctlParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classifier(&self) -> &DiskClassifier {
        &self.classifier
    }

    /// Build a disk record from the output probed through `header`
    pub fn parse_disk(&self, header: &DiskHeader, output: &str) -> Disk {
        let mut fields = extract_fields(output, &DISK_FIELD_RULES);

        let rotation_rate = fields.take(&DiskField::RotationRate);
        let sata_version = fields.take(&DiskField::SataVersion);
        let transport_protocol = fields.take(&DiskField::TransportProtocol);
        let smart_health_status = fields.take(&DiskField::SmartHealthStatus);

        let disk_type = self
            .classifier
            .classify(&sata_version, &transport_protocol, &rotation_rate);
        let status = self.classifier.status_from_health(&smart_health_status);
        let capacity_bytes = fields
            .get(&DiskField::CapacityBytes)
            .replace(',', "")
            .parse::<u64>()
            .ok();

        Disk {
            header: Some(header.clone()),
            name: header.disk_name(),
            wwn: normalize_wwn(fields.get(&DiskField::Wwn)),
            serial_number: fields.take(&DiskField::SerialNumber),
            vendor: fields.take(&DiskField::Vendor),
            model: fields.take(&DiskField::Model),
            firmware_version: fields.take(&DiskField::FirmwareVersion),
            sata_version,
            sector_size: fields.take(&DiskField::SectorSize),
            size: fields.take(&DiskField::Size),
            capacity_bytes,
            transport_protocol,
            rotation_rate,
            peripheral_device_type: fields.take(&DiskField::PeripheralDeviceType),
            smart_health_status,
            disk_type,
            status,
        }
    }

    /// Extract the SMART metric map from the same output
    pub fn parse_metrics(&self, output: &str) -> SmartMetrics {
        let mut metrics = SmartMetrics::default();

        for line in output.lines() {
            if let Some(caps) = DISK_FIELD_RULES
                .iter()
                .filter(|rule| rule.field == DiskField::Wwn)
                .find_map(|rule| rule.pattern.captures(line))
            {
                metrics.wwn = normalize_wwn(&caps[1]);
            }

            if let Some(caps) = CURRENT_TEMPERATURE.captures(line) {
                metrics.insert_int("CurrentDriveTemperature_raw", &caps[1]);
            }
            if let Some(caps) = TRIP_TEMPERATURE.captures(line) {
                metrics.insert_int("DriveTripTemperature_raw", &caps[1]);
            }
            if let Some(caps) = GROWN_DEFECT_LIST.captures(line) {
                metrics.insert_int("ElementsInGrownDefectList_raw", &caps[1]);
            }
            if let Some(caps) = POWER_ON_HOURS.iter().find_map(|p| p.captures(line)) {
                metrics.insert_int("9_raw", &caps[1]);
            }

            if let Some(caps) = ATTRIBUTE.captures(line) {
                if let Some(value) = parse_raw_value(&caps[2]) {
                    metrics
                        .values
                        .insert(format!("{}_raw", &caps[1]), MetricValue::Integer(value));
                }
            }

            if let Some(caps) = ERROR_COUNTER_LOG.captures(line) {
                let direction = match &caps[1] {
                    "read" => "Read",
                    "write" => "Write",
                    _ => continue,
                };
                for (column, prefix) in ERROR_COUNTER_COLUMNS.iter().enumerate() {
                    let raw = &caps[column + 2];
                    let name = format!("{}{}_raw", prefix, direction);
                    if column == ERROR_COUNTER_FLOAT_COLUMN {
                        if let Ok(value) = raw.parse::<f64>() {
                            metrics.values.insert(name, MetricValue::Float(value));
                        }
                    } else {
                        metrics.insert_int(name, raw);
                    }
                }
            }
        }

        metrics
    }
}
