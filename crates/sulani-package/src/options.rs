//! Package read options.

/// Options controlling how a package is decoded.
///
/// The default is strict: header problems are errors and every entry is
/// dispatched to its resource model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Continue past a bad magic, version or index version field.
    pub ignore_header_errors: bool,
    /// Keep every entry as raw bytes instead of decoding it.
    pub load_all_as_raw: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_header_errors(mut self, ignore: bool) -> Self {
        self.ignore_header_errors = ignore;
        self
    }

    pub fn with_load_all_as_raw(mut self, raw: bool) -> Self {
        self.load_all_as_raw = raw;
        self
    }
}
