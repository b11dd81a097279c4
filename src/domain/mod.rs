//! Core value types shared across pool implementations.

mod pool_request;
mod rounding;
mod swap_spec;
mod token;

pub use pool_request::{ExitRequest, JoinExitResult, JoinRequest};
pub use rounding::Rounding;
pub use swap_spec::SwapRequest;
pub use token::{Token, TokenAddress};
