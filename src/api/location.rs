use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Position of a block among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Index(u32),
    First,
    #[default]
    Last,
}

impl Order {
    pub fn to_value(self) -> Value {
        match self {
            Order::Index(index) => Value::from(index),
            Order::First => Value::from("first"),
            Order::Last => Value::from("last"),
        }
    }

    /// Reads an order back out of a wire record. Absent or null means last.
    pub fn from_value(value: Option<&Value>) -> Result<Self, String> {
        match value {
            None | Some(Value::Null) => Ok(Order::Last),
            Some(Value::Number(number)) => number
                .as_u64()
                .and_then(|index| u32::try_from(index).ok())
                .map(Order::Index)
                .ok_or_else(|| format!("invalid order {}", number)),
            Some(Value::String(raw)) => raw.parse(),
            Some(other) => Err(format!("invalid order {}", other)),
        }
    }
}

impl FromStr for Order {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "first" => Ok(Order::First),
            "last" => Ok(Order::Last),
            _ => trimmed.parse::<u32>().map(Order::Index).map_err(|_| {
                format!(
                    "invalid order '{}'; use a number, 'first', or 'last'",
                    raw
                )
            }),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Index(index) => write!(f, "{}", index),
            Order::First => write!(f, "first"),
            Order::Last => write!(f, "last"),
        }
    }
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Write target for a block. Callers set exactly one of `parent_uid`,
/// `page_title`, or `daily_note_date`; when several are set the parent wins,
/// then the daily note, then the page title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub parent_uid: Option<String>,
    pub page_title: Option<String>,
    /// `MM-DD-YYYY`
    pub daily_note_date: Option<String>,
    pub order: Order,
}

impl Location {
    pub fn parent(uid: impl Into<String>) -> Self {
        Self {
            parent_uid: Some(uid.into()),
            ..Self::default()
        }
    }

    pub fn page(title: impl Into<String>) -> Self {
        Self {
            page_title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn daily_note(date: impl Into<String>) -> Self {
        Self {
            daily_note_date: Some(date.into()),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn parent_uid(&self) -> Option<&str> {
        non_empty(self.parent_uid.as_deref())
    }

    pub fn page_title(&self) -> Option<&str> {
        non_empty(self.page_title.as_deref())
    }

    pub fn daily_note_date(&self) -> Option<&str> {
        non_empty(self.daily_note_date.as_deref())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.to_map_with(|uid| Value::from(uid))
    }

    /// Serializes the location, letting the caller decide how the parent uid
    /// is represented on the wire.
    pub(crate) fn to_map_with(&self, parent: impl Fn(&str) -> Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("order".to_string(), self.order.to_value());
        if let Some(uid) = self.parent_uid() {
            map.insert("parent-uid".to_string(), parent(uid));
        } else if let Some(date) = self.daily_note_date() {
            let mut daily = Map::new();
            daily.insert("daily-note-page".to_string(), Value::from(date));
            map.insert("page-title".to_string(), Value::Object(daily));
        } else if let Some(title) = self.page_title() {
            map.insert("page-title".to_string(), Value::from(title));
        }
        map
    }

    /// Parses a wire location. Integer parent uids (tempids) come back as
    /// their decimal string.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, String> {
        let order = Order::from_value(map.get("order"))?;

        if let Some(raw) = map.get("parent-uid") {
            let parent = uid_from_value(raw)
                .filter(|uid| !uid.is_empty())
                .ok_or_else(|| "parent-uid required in location".to_string())?;
            return Ok(Location::parent(parent).with_order(order));
        }

        match map.get("page-title") {
            Some(Value::String(title)) if !title.is_empty() => {
                Ok(Location::page(title.clone()).with_order(order))
            }
            Some(Value::Object(daily)) => match daily.get("daily-note-page") {
                Some(Value::String(date)) if !date.is_empty() => {
                    Ok(Location::daily_note(date.clone()).with_order(order))
                }
                _ => Err("page-title required in location".to_string()),
            },
            _ => Err("location requires parent-uid or page-title".to_string()),
        }
    }
}

/// Accepts a uid given as a string or an integer.
pub(crate) fn uid_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(uid) => Some(uid.clone()),
        Value::Number(number) => number.as_i64().map(|id| id.to_string()),
        _ => None,
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|value| !value.is_empty())
}
