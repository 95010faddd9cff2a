//! The record model: one address plus where it came from.

use crate::error::{IngestError, MalformedReason, Result};

/// Leading columns before the address fragments start.
const ADDRESS_COLUMN: usize = 2;

/// One address entry read from an input file.
///
/// Fields are private; a record cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    source:  String,
    id:      String,
    sensor:  bool,
    address: String,
}

impl Record {
    pub fn new(
        source: impl Into<String>,
        id: impl Into<String>,
        sensor: bool,
        address: impl Into<String>,
    ) -> Result<Self> {
        let source = source.into();
        if source.is_empty() {
            return Err(IngestError::EmptySource);
        }
        Ok(Self {
            source,
            id: id.into(),
            sensor,
            address: address.into(),
        })
    }

    /// Map a raw row shaped like `id,sensor,address,fragments,...`.
    ///
    /// `source` and `row` identify the origin for error reporting; `row`
    /// is the 0-based index of this row within the source.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Malformed`] when the row has fewer than three
    /// columns or the sensor column is not one of `1`, `0`, `true`, `false`
    /// (case-insensitive).
    pub fn from_row<S: AsRef<str>>(row: &[S], source: &str, row_index: usize) -> Result<Self> {
        let malformed = |reason| IngestError::Malformed {
            file: source.to_string(),
            row: row_index,
            reason,
        };

        if row.len() <= ADDRESS_COLUMN {
            return Err(malformed(MalformedReason::TooFewColumns { found: row.len() }));
        }

        let flag = row[1].as_ref();
        let sensor = parse_sensor(flag).ok_or_else(|| {
            malformed(MalformedReason::InvalidSensor {
                value: flag.to_string(),
            })
        })?;

        let address: String = row[ADDRESS_COLUMN..].iter().map(AsRef::as_ref).collect();

        Self::new(source, row[0].as_ref(), sensor, address)
    }

    pub fn source(&self) -> &str { &self.source }

    pub fn id(&self) -> &str { &self.id }

    pub fn sensor(&self) -> bool { self.sensor }

    pub fn address(&self) -> &str { &self.address }
}

/// Accepts `1`/`true` and `0`/`false`, ignoring ASCII case.
pub fn parse_sensor(value: &str) -> Option<bool> {
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_row_concatenates_address() {
        let row = ["42", "false", "1600 Amphitheatre Pkwy", ", Mountain View", ", CA"];
        let record = Record::from_row(&row, "input.csv", 0).unwrap();

        assert_eq!(record.id(), "42");
        assert!(!record.sensor());
        assert_eq!(record.address(), "1600 Amphitheatre Pkwy, Mountain View, CA");
        assert_eq!(record.source(), "input.csv");
    }

    #[test]
    fn test_from_row_sensor_spellings() {
        for (flag, expected) in [
            ("1", true),
            ("true", true),
            ("TRUE", true),
            ("True", true),
            ("0", false),
            ("false", false),
            ("FaLsE", false),
        ] {
            let record = Record::from_row(&["id", flag, "addr"], "f", 0).unwrap();
            assert_eq!(record.sensor(), expected, "flag {flag:?}");
        }
    }

    #[test]
    fn test_from_row_rejects_unknown_sensor() {
        let err = Record::from_row(&["id", "yes", "addr"], "f.csv", 7).unwrap_err();
        match err {
            IngestError::Malformed { file, row, reason } => {
                assert_eq!(file, "f.csv");
                assert_eq!(row, 7);
                assert_eq!(reason, MalformedReason::InvalidSensor {
                    value: "yes".to_string()
                });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_row_too_few_columns() {
        let err = Record::from_row(&["id", "true"], "f.csv", 3).unwrap_err();
        assert_eq!(err.row(), Some(3));
        assert_eq!(
            err.to_string(),
            "malformed record in f.csv at row 3: expected at least 3 columns, found 2"
        );
        assert!(matches!(err, IngestError::Malformed {
            reason: MalformedReason::TooFewColumns { found: 2 },
            ..
        }));
    }

    #[test]
    fn test_from_row_empty_source() {
        let err = Record::from_row(&["id", "true", "addr"], "", 0).unwrap_err();
        assert!(matches!(err, IngestError::EmptySource));
    }

    #[test]
    fn test_parse_sensor_whitespace_is_not_trimmed() {
        assert_eq!(parse_sensor(" true"), None);
        assert_eq!(parse_sensor("2"), None);
        assert_eq!(parse_sensor(""), None);
    }
}
