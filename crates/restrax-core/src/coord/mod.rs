mod index;
mod reader;

pub use index::{classify_polymer_type, CoordinateIndex, CoordinateIndexBuilder};
pub use reader::{index_from_reader, AtomSiteRow, CoordReader, PdbtbxReader};
