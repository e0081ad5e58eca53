pub mod extract;
pub mod signing;
pub mod users;

pub use extract::*;
pub use signing::*;
pub use users::*;

#[cfg(test)]
mod tests;
