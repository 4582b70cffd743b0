pub mod order;
pub mod trade;
pub mod wallet;

pub use order::*;
pub use trade::*;
pub use wallet::*;
