//! Point-table CSV reader for `GeoIngest`.
//!
//! A CSV upload is a plain table with one latitude and one longitude column.
//! The reader locates those columns (explicitly named or detected from a
//! canonical list), infers a type for every column and builds one point per
//! row in WGS 84.
//!
//! # Example
//!
//! ```
//! use geoingest_core_common::{DatasetReader, InputFile, InputFiles};
//! use geoingest_csv::{CsvReader, INPUT_CSV};
//!
//! let inputs = InputFiles::new().with(
//!     INPUT_CSV,
//!     InputFile::new(b"name,latitude,longitude\nA,52.5,13.4\n".to_vec()),
//! );
//! let dataset = CsvReader::default().read_dataset(&inputs)?;
//! assert_eq!(dataset.len(), 1);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod columns;
pub mod options;
pub mod reader;

use geoingest_core_common::{Driver, InputSpec};

pub use columns::{CoordinateColumns, detect_coordinate_columns};
pub use options::CsvReadOptions;
pub use reader::CsvReader;

/// Input stream identifier of the CSV table.
pub const INPUT_CSV: &str = "file_csv";

/// Descriptor of the CSV format.
pub const DRIVER: Driver = Driver::new(
    "csv",
    "Comma Separated Value (.csv) with latitude/longitude columns",
    &["csv"],
    &[InputSpec::required(INPUT_CSV, "CSV table")],
    false,
);
