use serde_json::Value as Json;

/// A value read from a message, possibly missing
///
/// Accessors coerce loosely: a missing value reads as an empty string, zero
/// or false rather than failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Value {
    inner: Option<Json>,
}

impl Value {
    pub fn missing() -> Self {
        Self { inner: None }
    }

    pub fn exists(&self) -> bool {
        self.inner.is_some()
    }

    pub fn as_json(&self) -> Option<&Json> {
        self.inner.as_ref()
    }

    /// Consume the value; a missing value becomes JSON null
    pub fn into_json(self) -> Json {
        self.inner.unwrap_or(Json::Null)
    }

    /// String form: strings unquoted, other JSON serialized, null and missing empty
    pub fn as_string(&self) -> String {
        match &self.inner {
            None | Some(Json::Null) => String::new(),
            Some(Json::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_string().into_bytes()
    }

    pub fn as_f64(&self) -> f64 {
        match &self.inner {
            Some(Json::Number(n)) => n.as_f64().unwrap_or_default(),
            Some(Json::String(s)) => s.trim().parse().unwrap_or_default(),
            Some(Json::Bool(true)) => 1.0,
            _ => 0.0,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match &self.inner {
            Some(Json::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or_default() as i64),
            Some(Json::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .unwrap_or_else(|_| s.parse::<f64>().map(|f| f as i64).unwrap_or_default())
            }
            Some(Json::Bool(true)) => 1,
            _ => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        match &self.inner {
            Some(Json::Bool(b)) => *b,
            Some(Json::String(s)) => matches!(s.trim(), "true" | "1" | "t" | "T" | "TRUE" | "True"),
            Some(Json::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.inner, Some(Json::Array(_)))
    }

    /// Array elements; a scalar reads as a one-element array, missing as empty
    pub fn array(&self) -> Vec<Value> {
        match &self.inner {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items.iter().cloned().map(Value::from).collect(),
            Some(other) => vec![Value::from(other.clone())],
        }
    }

    /// Object members in document order
    pub fn object(&self) -> Vec<(String, Value)> {
        match &self.inner {
            Some(Json::Object(map)) => map
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Self { inner: Some(json) }
    }
}

impl From<Option<Json>> for Value {
    fn from(inner: Option<Json>) -> Self {
        Self { inner }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}
