use indexmap::IndexMap;
use serde::{ser::Error as _, Serialize, Serializer};

/// The value of a single data point.
///
/// The ingestion endpoint accepts either a JSON number or a JSON string for the value of a data
/// point, so values are serialized without any wrapping: `Integer(42)` becomes `42`, `Float(0.5)`
/// becomes `0.5` and `String("1.5e3")` becomes `"1.5e3"`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A signed integer value.
    Integer(i64),

    /// A floating-point value.
    ///
    /// Non-finite values (NaN and the infinities) have no JSON representation and will fail to
    /// encode when sent.
    Float(f64),

    /// A value passed through as a string, left to the endpoint to parse.
    String(String),
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            Value::Float(value) => {
                Err(S::Error::custom(format_args!("non-finite value {value} cannot be encoded")))
            }
            Value::String(value) => serializer.serialize_str(value),
        }
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Integer(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Self {
        Value::String(value.to_string())
    }
}

/// A single time-series data point.
///
/// A metric is made up of a timestamp (in seconds since the Unix epoch), a metric name, a value,
/// and a set of tags. The ingestion endpoint requires every data point to carry tags, so a metric
/// whose tags were never set is rejected by [`Client`][crate::Client] before anything is sent.
/// An empty set of tags, as created by [`with_tags`][Metric::with_tags] with no pairs, is accepted.
///
/// Tags are written to the wire in the order they were added.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metric {
    timestamp: i64,
    #[serde(rename = "metric")]
    name: String,
    value: Value,
    tags: Option<IndexMap<String, String>>,
}

impl Metric {
    /// Creates a new [`Metric`] without any tags.
    ///
    /// At least one call to [`with_tag`][Metric::with_tag] or [`with_tags`][Metric::with_tags] is
    /// required before the metric can be sent.
    pub fn new<N, V>(timestamp: i64, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        Self { timestamp, name: name.into(), value: value.into(), tags: None }
    }

    /// Adds a tag to this metric.
    ///
    /// If a tag with the same key already exists, its value is replaced in place.
    #[must_use]
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.get_or_insert_with(IndexMap::new).insert(key.into(), value.into());
        self
    }

    /// Adds all of the given tags to this metric.
    ///
    /// Marks the tags of this metric as set even when `tags` yields nothing.
    #[must_use]
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let existing = self.tags.get_or_insert_with(IndexMap::new);
        existing.extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Timestamp of this metric, in seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Name of this metric.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of this metric.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Tags of this metric, or `None` if they were never set.
    pub fn tags(&self) -> Option<&IndexMap<String, String>> {
        self.tags.as_ref()
    }

    pub(crate) fn has_tags(&self) -> bool {
        self.tags.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{Metric, Value};

    #[test]
    fn test_wire_format() {
        let metric = Metric::new(1_700_000_000, "sys.cpu.user", 42)
            .with_tag("host", "web01")
            .with_tag("cpu", "0");

        let encoded = serde_json::to_string(&metric).unwrap();
        assert_eq!(
            encoded,
            r#"{"timestamp":1700000000,"metric":"sys.cpu.user","value":42,"tags":{"host":"web01","cpu":"0"}}"#
        );
    }

    #[test]
    fn test_value_representations() {
        let cases = vec![
            (Value::from(-7i32), "-7"),
            (Value::from(0.25f64), "0.25"),
            (Value::from(1.5f32), "1.5"),
            (Value::from("12.5"), r#""12.5""#),
            (Value::from(String::from("up")), r#""up""#),
            (Value::from(u32::MAX), "4294967295"),
        ];

        for (value, expected) in cases {
            assert_eq!(serde_json::to_string(&value).unwrap(), expected);
        }
    }

    #[test]
    fn test_non_finite_values_fail_to_encode() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let metric = Metric::new(0, "broken", value).with_tag("host", "web01");
            let err = serde_json::to_vec(&[metric]).unwrap_err();
            assert!(err.to_string().contains("non-finite"));
        }
    }

    #[test]
    fn test_tags_presence() {
        let untagged = Metric::new(0, "requests", 1);
        assert!(!untagged.has_tags());
        assert!(untagged.tags().is_none());

        let empty = Metric::new(0, "requests", 1).with_tags(Vec::<(String, String)>::new());
        assert!(empty.has_tags());
        assert_eq!(serde_json::to_value(&empty).unwrap()["tags"], serde_json::json!({}));

        let replaced = Metric::new(0, "requests", 1)
            .with_tags([("host", "web01"), ("dc", "east")])
            .with_tag("host", "web02");
        let tags = replaced.tags().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get_index(0), Some((&"host".to_string(), &"web02".to_string())));
    }
}
