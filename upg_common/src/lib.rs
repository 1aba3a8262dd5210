//! Value types shared by every crate in the upay workspace.
//!
//! * [`Amount`] is the fixed two-decimal quantity used for quote (fiat) and on-chain amounts alike.
//! * [`Secret`] keeps API keys and signing secrets out of logs.
mod amount;
mod helpers;

pub mod op;
mod secret;

pub use amount::{Amount, AmountError, AMOUNT_INCREMENT, AMOUNT_SCALE, MIN_PAYMENT_AMOUNT};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
