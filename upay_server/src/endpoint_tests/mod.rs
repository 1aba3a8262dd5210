pub(crate) mod helpers;
pub(crate) mod mocks;
mod orders;
