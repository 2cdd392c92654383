mod naming;
mod string_utils;

pub use naming::*;
pub use string_utils::*;
