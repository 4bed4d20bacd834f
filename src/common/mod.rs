mod fs;
mod io;

pub(crate) use fs::*;
pub(crate) use io::*;
pub use io::read_parquet;
