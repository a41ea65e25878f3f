pub mod matcher;
pub mod filter;

pub use matcher::*;
pub use filter::*;

#[cfg(test)]
mod tests;
