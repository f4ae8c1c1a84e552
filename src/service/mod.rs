pub mod approval;
pub mod listing;

pub use approval::{ApplicationService, SubmitRequest};
pub use listing::{ListFilter, ListingService, MemberTypeCounts, Stats};
