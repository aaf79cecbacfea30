pub mod event;
pub mod rsvp;
pub mod stats;
pub mod summary;
