//! CSV read configuration.

/// CSV read options
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// The delimiter character (default: b',')
    pub delimiter: u8,
    /// Explicit latitude column; used only when both explicit columns exist
    pub lat_column: Option<String>,
    /// Explicit longitude column; used only when both explicit columns exist
    pub lon_column: Option<String>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            lat_column: None,
            lon_column: None,
        }
    }
}

impl CsvReadOptions {
    /// Create new CSV read options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter character
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the latitude column name
    #[must_use]
    pub fn with_lat_column(mut self, column: impl Into<String>) -> Self {
        self.lat_column = Some(column.into());
        self
    }

    /// Set the longitude column name
    #[must_use]
    pub fn with_lon_column(mut self, column: impl Into<String>) -> Self {
        self.lon_column = Some(column.into());
        self
    }
}
