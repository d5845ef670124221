// Library root: race timing, scoring, rankings and the persistent store
// behind the event console.

pub mod config;
pub mod db;
pub mod leaderboard;
pub mod race;
pub mod roster;
pub mod scores;
pub mod scoring;
pub mod store;
