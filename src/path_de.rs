use serde::de::DeserializeOwned;

use crate::error::LoadError;

fn located(err: serde_path_to_error::Error<serde_json::Error>) -> LoadError {
    let path = err.path().to_string();
    LoadError::Parse { path, message: err.into_inner().to_string() }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, LoadError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(located)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{EnumDecl, SchemaDoc};
    use serde_json::json;

    #[test]
    fn errors_name_the_offending_element() {
        let err = from_str_with_path::<EnumDecl>(r#"{"name": "Format", "symbols": ["fastq", 3]}"#).unwrap_err();
        let LoadError::Parse { path, .. } = err else {
            panic!("expected a parse error");
        };
        assert_eq!(path, "symbols[1]");

        let err = from_value_with_path::<SchemaDoc>(json!({"types": 7})).unwrap_err();
        assert!(err.to_string().starts_with("at JSON path"));
    }
}
