use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::{KinshipError, KinshipResult};

/// Which side of the graph a row belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Entity,
    Relation,
}

impl CandidateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateKind::Entity => "entity",
            CandidateKind::Relation => "relation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "entity" => Some(CandidateKind::Entity),
            "relation" => Some(CandidateKind::Relation),
            _ => None,
        }
    }
}

/// Declared datatype of an attribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Str,
    Url,
    Integer,
    Float,
    DateTime,
    Boolean,
}

/// Typed column of a property row that holds the value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ValueColumn {
    String,
    Integer,
    Float,
    DateTime,
    Boolean,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Str => "string",
            ValueType::Url => "url",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::DateTime => "datetime",
            ValueType::Boolean => "boolean",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(ValueType::Str),
            "url" => Some(ValueType::Url),
            "integer" => Some(ValueType::Integer),
            "float" => Some(ValueType::Float),
            "datetime" => Some(ValueType::DateTime),
            "boolean" => Some(ValueType::Boolean),
            _ => None,
        }
    }

    pub fn column(self) -> ValueColumn {
        match self {
            ValueType::Str | ValueType::Url => ValueColumn::String,
            ValueType::Integer => ValueColumn::Integer,
            ValueType::Float => ValueColumn::Float,
            ValueType::DateTime => ValueColumn::DateTime,
            ValueType::Boolean => ValueColumn::Boolean,
        }
    }

    /// Converts a raw request string into a value of this type.
    pub fn coerce(self, raw: &str) -> KinshipResult<Value> {
        let trimmed = raw.trim();
        match self {
            ValueType::Str | ValueType::Url => Ok(Value::Str(raw.to_string())),
            ValueType::Integer => trimmed.parse::<i64>().map(Value::Integer).map_err(|err| {
                KinshipError::invalid(format!("'{raw}' is not an integer: {err}"))
            }),
            ValueType::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|err| KinshipError::invalid(format!("'{raw}' is not a number: {err}"))),
            ValueType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Boolean(true)),
                "false" | "0" | "no" => Ok(Value::Boolean(false)),
                _ => Err(KinshipError::invalid(format!("'{raw}' is not a boolean"))),
            },
            ValueType::DateTime => parse_datetime_millis(trimmed).map(Value::DateTime),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Str(String),
    Integer(i64),
    Float(f64),
    /// Milliseconds since the Unix epoch, UTC.
    DateTime(i64),
    Boolean(bool),
}

impl Value {
    pub fn column(&self) -> ValueColumn {
        match self {
            Value::Str(_) => ValueColumn::String,
            Value::Integer(_) => ValueColumn::Integer,
            Value::Float(_) => ValueColumn::Float,
            Value::DateTime(_) => ValueColumn::DateTime,
            Value::Boolean(_) => ValueColumn::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

fn parse_datetime_millis(raw: &str) -> KinshipResult<i64> {
    let moment = match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(moment) => moment,
        Err(_) => Date::parse(raw, format_description!("[year]-[month]-[day]"))
            .map(|date| date.midnight().assume_utc())
            .map_err(|err| KinshipError::invalid(format!("'{raw}' is not a datetime: {err}")))?,
    };
    i64::try_from(moment.unix_timestamp_nanos() / 1_000_000)
        .map_err(|_| KinshipError::invalid(format!("'{raw}' is out of range")))
}
