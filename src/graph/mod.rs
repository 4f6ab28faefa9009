pub mod construction;
pub mod model;
pub mod serialization;

pub use construction::RecordLoader;
pub use model::{EdgeAttributes, GraphRecord, NodeFeatures, RawRecord, RawSplit, RecordGraph};
pub use serialization::RecordWriter;
