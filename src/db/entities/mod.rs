pub mod groups;
pub mod songs;

pub use groups::Entity as Group;
pub use songs::Entity as Song;
