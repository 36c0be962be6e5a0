pub mod token;

pub use token::{DispenseOutcome, Token, TokenError};
