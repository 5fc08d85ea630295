//! Per-entity static filter tables consumed by the list/count handlers.
//! Each entity declares how raw filter keys map to columns, defaults,
//! operators and dependencies; the generic engine does the rest.

pub mod lobby;
pub mod participant;
pub mod team;

pub use lobby::{LOBBY_FILTERS, LOBBIES_TABLE};
pub use participant::{PARTICIPANT_FILTERS, PARTICIPANTS_TABLE};
pub use team::{TEAM_FILTERS, TEAMS_TABLE};
