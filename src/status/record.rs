use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde_json::{Map, Value};

/// Field injected into every stored record
pub const LAST_UPDATE_FIELD: &str = "last update";

/// Wall-clock format used for `last update` and other displayed stamps
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Last known status of one device, replaced wholesale on every write
#[derive(Clone, Debug, PartialEq)]
pub struct StatusRecord {
    /// Fields as reported by the device
    pub fields: Map<String, Value>,

    /// When the record was written (second resolution)
    pub last_update: DateTime<Local>,
}

impl StatusRecord {
    pub fn new(mut fields: Map<String, Value>, now: DateTime<Local>) -> Self {
        // A device-supplied stamp must not shadow the injected one
        fields.remove(LAST_UPDATE_FIELD);
        Self {
            fields,
            last_update: truncate_to_seconds(now),
        }
    }

    /// Persisted/displayed form: device fields plus `last update`
    pub fn to_json(&self) -> Map<String, Value> {
        let mut out = self.fields.clone();
        out.insert(
            LAST_UPDATE_FIELD.to_string(),
            Value::String(format_stamp(&self.last_update)),
        );
        out
    }

    /// Rebuild a record from its persisted form.
    ///
    /// Returns None if the `last update` stamp is missing or unparseable.
    pub fn from_json(mut fields: Map<String, Value>) -> Option<Self> {
        let stamp = fields.remove(LAST_UPDATE_FIELD)?;
        let naive = NaiveDateTime::parse_from_str(stamp.as_str()?, STAMP_FORMAT).ok()?;
        let last_update = Local.from_local_datetime(&naive).earliest()?;
        Some(Self {
            fields,
            last_update,
        })
    }

    /// String view of a field, if it is present and a string
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

pub fn format_stamp(stamp: &DateTime<Local>) -> String {
    stamp.format(STAMP_FORMAT).to_string()
}

fn truncate_to_seconds(now: DateTime<Local>) -> DateTime<Local> {
    Local
        .timestamp_opt(now.timestamp(), 0)
        .single()
        .unwrap_or(now)
}
