mod constants;
mod data;
mod fake;
mod objs;

pub use constants::*;
pub use data::*;
pub use fake::*;
pub use objs::*;
pub use rstest::*;
