//! Process-local collaborator implementations, for single-instance deployments and tests.
mod reservations;

pub use reservations::MemoryReservationStore;
