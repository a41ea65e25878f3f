pub mod rule;
pub mod resolver;

pub use rule::*;
pub use resolver::*;
