use chrono::{DateTime, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::import::ImportFormat;
use crate::models::{Activity, ActivityPoint};

/// Prefix of auxiliary columns kept as raw channels
pub const CHANNEL_PREFIX: &str = "unknown_";

/// Derived grades are clamped to ±25 %
pub const MAX_DERIVED_GRADE: f64 = 0.25;

/// Canonical fields of the column schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Timestamp,
    Power,
    SpeedMps,
    SpeedKmh,
    Grade,
    Cda,
    Elevation,
    Distance,
}

impl Field {
    /// Schema name; both speed units map to one column slot
    fn canonical(&self) -> &'static str {
        match self {
            Field::Timestamp => "timestamp",
            Field::Power => "power",
            Field::SpeedMps | Field::SpeedKmh => "speed",
            Field::Grade => "grade",
            Field::Cda => "cda",
            Field::Elevation => "elevation",
            Field::Distance => "distance",
        }
    }
}

/// Raw per-row values before grade derivation
#[derive(Debug, Default)]
struct Row {
    timestamp: Option<u32>,
    power: f64,
    speed_mps: f64,
    grade: Option<f64>,
    cda: Option<f64>,
    elevation: Option<f64>,
    distance: Option<f64>,
}

/// CSV importer with an explicit column schema.
///
/// Headers are matched by exact (normalized) name only. `power` and a speed
/// column are required; everything else is optional.
pub struct CsvImporter {
    column_mapping: HashMap<String, Field>,
}

impl CsvImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(
            &mut column_mapping,
            Field::Timestamp,
            &["timestamp", "time", "elapsed"],
        );
        Self::add_mapping(&mut column_mapping, Field::Power, &["power", "watts"]);
        Self::add_mapping(
            &mut column_mapping,
            Field::SpeedMps,
            &["speed", "speed_mps", "velocity"],
        );
        Self::add_mapping(&mut column_mapping, Field::SpeedKmh, &["speed_kmh", "speed_kph"]);
        Self::add_mapping(&mut column_mapping, Field::Grade, &["grade", "slope"]);
        Self::add_mapping(
            &mut column_mapping,
            Field::Cda,
            &["cda", "measured_cda", "cda_m2"],
        );
        Self::add_mapping(&mut column_mapping, Field::Elevation, &["elevation", "altitude"]);
        Self::add_mapping(&mut column_mapping, Field::Distance, &["distance"]);

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, Field>, field: Field, names: &[&str]) {
        for name in names {
            mapping.insert(name.to_string(), field);
        }
    }

    fn normalize_column_name(name: &str) -> String {
        name.trim().to_lowercase().replace([' ', '-'], "_")
    }

    /// Seconds since epoch or one of a few datetime layouts
    fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
        const FORMATS: [&str; 5] = [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%SZ",
        ];

        FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
            .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc)))
    }

    fn parse_number(value: &str) -> Option<f64> {
        value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Fill missing grades from Δelevation / Δdistance between consecutive
    /// rows that carry both, clamped to ±25 %
    fn derive_grades(rows: &mut [Row]) {
        let mut previous: Option<(f64, f64)> = None;
        for row in rows.iter_mut() {
            let (Some(elevation), Some(distance)) = (row.elevation, row.distance) else {
                row.grade.get_or_insert(0.0);
                continue;
            };

            if row.grade.is_none() {
                let grade = match previous {
                    Some((prev_elevation, prev_distance)) if distance > prev_distance => {
                        ((elevation - prev_elevation) / (distance - prev_distance))
                            .clamp(-MAX_DERIVED_GRADE, MAX_DERIVED_GRADE)
                    }
                    _ => 0.0,
                };
                row.grade = Some(grade);
            }
            previous = Some((elevation, distance));
        }
    }

    fn activity_id(file_path: &Path) -> String {
        file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for CsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<Activity>, ImportError> {
        let parse_error = |e: csv::Error| ImportError::ParseError {
            format: "CSV".to_string(),
            reason: e.to_string(),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(file_path)
            .map_err(parse_error)?;

        let headers = reader.headers().map_err(parse_error)?.clone();

        // Header order; each schema field may appear once
        let mut fields: Vec<(usize, Field)> = Vec::new();
        let mut channel_columns: Vec<(usize, String)> = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            let name = Self::normalize_column_name(header);
            if let Some(field) = self.column_mapping.get(&name) {
                if let Some((_, existing)) = fields
                    .iter()
                    .find(|(_, f)| f.canonical() == field.canonical())
                {
                    return Err(ImportError::ParseError {
                        format: "CSV".to_string(),
                        reason: format!(
                            "column '{}' duplicates the {} field already mapped",
                            header.trim(),
                            existing.canonical()
                        ),
                    });
                }
                fields.push((i, *field));
            } else if name.starts_with(CHANNEL_PREFIX) {
                channel_columns.push((i, name));
            }
        }

        if !fields.iter().any(|(_, f)| *f == Field::Power) {
            return Err(ImportError::MissingColumn {
                column: "power".to_string(),
            });
        }
        if !fields
            .iter()
            .any(|(_, f)| matches!(f, Field::SpeedMps | Field::SpeedKmh))
        {
            return Err(ImportError::MissingColumn {
                column: "speed".to_string(),
            });
        }

        let mut rows: Vec<Row> = Vec::new();
        let mut channels: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut start_time: Option<DateTime<Utc>> = None;
        let mut skipped = 0usize;

        for record in reader.records() {
            let record = record.map_err(parse_error)?;
            let mut row = Row::default();
            let mut has_power = false;
            let mut has_speed = false;

            for (i, field) in &fields {
                let Some(value) = record.get(*i).filter(|v| !v.is_empty()) else {
                    continue;
                };

                match field {
                    Field::Timestamp => {
                        row.timestamp = if let Some(elapsed) = Self::parse_number(value) {
                            Some(elapsed.max(0.0) as u32)
                        } else if let Some(dt) = Self::parse_datetime(value) {
                            let start = *start_time.get_or_insert(dt);
                            Some((dt - start).num_seconds().max(0) as u32)
                        } else {
                            None
                        };
                    }
                    Field::Power => {
                        if let Some(power) = Self::parse_number(value) {
                            row.power = power;
                            has_power = true;
                        }
                    }
                    Field::SpeedMps => {
                        if let Some(speed) = Self::parse_number(value) {
                            row.speed_mps = speed;
                            has_speed = true;
                        }
                    }
                    Field::SpeedKmh => {
                        if let Some(speed) = Self::parse_number(value) {
                            row.speed_mps = speed / 3.6;
                            has_speed = true;
                        }
                    }
                    Field::Grade => row.grade = Self::parse_number(value),
                    Field::Cda => row.cda = Self::parse_number(value),
                    Field::Elevation => row.elevation = Self::parse_number(value),
                    Field::Distance => row.distance = Self::parse_number(value),
                }
            }

            // Samples carry non-negative power and speed
            if !(has_power && has_speed) || row.power < 0.0 || row.speed_mps < 0.0 {
                skipped += 1;
                continue;
            }

            for (i, name) in &channel_columns {
                if let Some(value) = record.get(*i).and_then(Self::parse_number) {
                    channels.entry(name.clone()).or_default().push(value);
                }
            }

            rows.push(row);
        }

        if skipped > 0 {
            warn!(
                file = %file_path.display(),
                skipped, "Skipped rows without usable non-negative power and speed"
            );
        }

        if rows.is_empty() {
            return Err(ImportError::Empty {
                path: file_path.to_path_buf(),
            });
        }

        Self::derive_grades(&mut rows);

        let points: Vec<ActivityPoint> = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let point = ActivityPoint::new(
                    row.timestamp.unwrap_or(index as u32),
                    row.power,
                    row.speed_mps,
                    row.grade.unwrap_or(0.0),
                );
                match row.cda {
                    Some(cda) => point.with_measured_cda(cda),
                    None => point,
                }
            })
            .collect();

        debug!(
            file = %file_path.display(),
            points = points.len(),
            channels = channels.len(),
            "CSV parsed"
        );

        let mut activity = Activity::new(Self::activity_id(file_path), points);
        activity.source = Some(file_path.to_string_lossy().to_string());
        activity.channels = channels;

        Ok(vec![activity])
    }

    fn get_format_name(&self) -> &'static str {
        "CSV"
    }
}
