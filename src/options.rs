//! Decode-time configuration.

/// Default bound on nesting, matching serde_json's own recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What to do with mapping keys a record does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    #[default]
    Reject,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub unknown_fields: UnknownFields,
    /// Accept and retain namespaced keys (`prefix:name`) on any record.
    pub extension_fields: bool,
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            unknown_fields: UnknownFields::Reject,
            extension_fields: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    /// Ignores undeclared keys, for documents written against a newer schema.
    pub fn permissive() -> Self {
        Self { unknown_fields: UnknownFields::Ignore, ..Self::default() }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_extension_fields(mut self, enabled: bool) -> Self {
        self.extension_fields = enabled;
        self
    }
}
