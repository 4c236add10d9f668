//! File I/O, validation, and serialization for the samplecurve pipeline.

mod domain;
mod error;
mod reader;
mod split_file;
mod writer;

pub use domain::{DatasetName, NumericArray};
pub use error::IoError;
pub use reader::{ArrayReader, MaskReader};
pub use split_file::SplitFileReader;
pub use writer::SplitFileWriter;
