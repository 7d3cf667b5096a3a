use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::{PrecessionError, SimResult};

// ---------------------------------------------------------------------------
// Structured key/value records (config and body files)
// ---------------------------------------------------------------------------

/// Name of a YAML node kind, for error reporting.
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Deserialize a record from an already parsed document.
/// Anything other than a mapping fails with `ConfigType`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> SimResult<T> {
    if !value.is_mapping() {
        return Err(PrecessionError::ConfigType {
            found: kind_of(&value),
        });
    }
    Ok(serde_yaml::from_value(value)?)
}

/// Parse a record from YAML text.
pub fn from_str<T: DeserializeOwned>(yaml: &str) -> SimResult<T> {
    let value: Value = serde_yaml::from_str(yaml)?;
    from_value(value)
}

/// Read and parse a record from a YAML file.
pub fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> SimResult<T> {
    let content = std::fs::read_to_string(path)?;
    from_str(&content)
}

/// Render a record as YAML text.
pub fn to_string<T: Serialize>(record: &T) -> SimResult<String> {
    Ok(serde_yaml::to_string(record)?)
}

/// Write a record to a YAML file, replacing any existing content.
pub fn save<T: Serialize, P: AsRef<Path>>(path: P, record: &T) -> SimResult<()> {
    std::fs::write(path, to_string(record)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn sequence_document_is_a_type_error() {
        let err = from_str::<BTreeMap<String, f64>>("- 1\n- 2\n").unwrap_err();
        assert!(
            matches!(err, PrecessionError::ConfigType { found: "sequence" }),
            "got {err:?}"
        );
    }

    #[test]
    fn scalar_document_is_a_type_error() {
        let err = from_str::<BTreeMap<String, f64>>("42").unwrap_err();
        assert!(matches!(err, PrecessionError::ConfigType { found: "number" }));
    }

    #[test]
    fn mapping_document_parses() {
        let m: BTreeMap<String, f64> = from_str("tEnd: 30\nmaxSteps: 50\n").unwrap();
        assert_eq!(m["tEnd"], 30.0);
        assert_eq!(m["maxSteps"], 50.0);
    }
}
