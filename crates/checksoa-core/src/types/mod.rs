mod result;
mod status;
mod target;

pub use result::*;
pub use status::*;
pub use target::*;
