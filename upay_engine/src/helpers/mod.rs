mod amounts;

pub use amounts::{convert_quote, normalize_raw_amount};
