use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DecodeError, Path};
use crate::ir::{RecordDef, CLASS};
use crate::node::{Mapping, Node};
use crate::options::{DecodeOptions, UnknownFields};

// `prefix:name` or a full IRI; a bare word never counts as an extension
static EXTENSION_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.+-]*:\S+$").expect("extension key pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Declared,
    Extension,  // retained alongside the fields
    Ignored,    // dropped (permissive mode)
    Unknown,    // error (strict mode)
}

pub fn is_extension_key(key: &str) -> bool {
    EXTENSION_KEY.is_match(key)
}

pub fn classify_key(def: &RecordDef, key: &str, options: &DecodeOptions) -> KeyClass {
    if def.field(key).is_some() {
        KeyClass::Declared
    } else if options.extension_fields && is_extension_key(key) {
        KeyClass::Extension
    } else if options.unknown_fields == UnknownFields::Ignore {
        KeyClass::Ignored
    } else {
        KeyClass::Unknown
    }
}

/// A record with a `class` field only accepts mappings naming it there.
pub(crate) fn check_class(def: &RecordDef, map: &Mapping, path: &Path) -> Result<(), DecodeError> {
    if def.class_field().is_none() {
        return Ok(());
    }
    match map.get(CLASS).and_then(Node::as_str) {
        Some(class) if class == def.name => Ok(()),
        actual => Err(DecodeError::ClassMismatch {
            record: def.name.clone(),
            actual: actual.map(str::to_string),
            path: path.field(CLASS),
        }),
    }
}

/// Everything about a mapping that can be told without descending into it:
/// its class, its required keys, and keys the record does not tolerate.
pub(crate) fn check_shape(
    def: &RecordDef,
    map: &Mapping,
    path: &Path,
    options: &DecodeOptions,
) -> Result<(), DecodeError> {
    check_class(def, map, path)?;
    if let Some(field) = def.fields.iter().find(|f| f.required && !map.contains_key(&f.name)) {
        return Err(DecodeError::MissingField {
            record: def.name.clone(),
            field: field.name.clone(),
            path: path.field(&field.name),
        });
    }
    match map.keys().find(|key| classify_key(def, key, options) == KeyClass::Unknown) {
        Some(key) => Err(unknown(def, key, path)),
        None => Ok(()),
    }
}

pub(crate) fn unknown(def: &RecordDef, key: &str, path: &Path) -> DecodeError {
    DecodeError::UnknownField {
        record: def.name.clone(),
        field: key.to_string(),
        path: path.field(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, Ty};

    #[test]
    fn extension_keys_are_namespaced() {
        assert!(is_extension_key("edam:format"));
        assert!(is_extension_key("http://example.com/ns#tag"));
        assert!(!is_extension_key("format"));
        assert!(!is_extension_key(":format"));
        assert!(!is_extension_key("edam:"));
    }

    #[test]
    fn classification_order() {
        let def = RecordDef::new("R", vec![Field::new("a", Ty::string())]);
        let strict = DecodeOptions::strict();
        let permissive = DecodeOptions::permissive();
        assert_eq!(classify_key(&def, "a", &strict), KeyClass::Declared);
        assert_eq!(classify_key(&def, "x:y", &strict), KeyClass::Extension);
        assert_eq!(classify_key(&def, "b", &strict), KeyClass::Unknown);
        assert_eq!(classify_key(&def, "b", &permissive), KeyClass::Ignored);
        let no_ext = DecodeOptions::strict().with_extension_fields(false);
        assert_eq!(classify_key(&def, "x:y", &no_ext), KeyClass::Unknown);
    }

    #[test]
    fn class_must_name_the_record() {
        let def = RecordDef::new("File", vec![Field::new("class", Ty::string())]);
        let map = |v: serde_json::Value| Node::from(v).as_mapping().cloned().unwrap();
        assert!(check_class(&def, &map(serde_json::json!({"class": "File"})), &Path::root()).is_ok());

        let err = check_class(&def, &map(serde_json::json!({"class": "Directory"})), &Path::root()).unwrap_err();
        assert_eq!(err.path().to_string(), "class");
        assert!(matches!(err, DecodeError::ClassMismatch { actual: Some(ref a), .. } if a == "Directory"));
        assert!(check_class(&def, &map(serde_json::json!({})), &Path::root()).is_err());

        let plain = RecordDef::new("Dirent", vec![Field::new("entry", Ty::string())]);
        assert!(check_class(&plain, &map(serde_json::json!({"entry": "x"})), &Path::root()).is_ok());
    }
}
