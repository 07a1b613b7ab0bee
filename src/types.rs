//! Identifier aliases shared across the crate.

pub type ContactId = String;
pub type FollowUpId = String;
pub type TeamId = String;
pub type LocationId = String;
pub type OutbreakId = String;
