pub mod enrichment;
pub mod fixture;
pub mod songs;

pub use enrichment::{EnrichmentService, SongDetail};
pub use fixture::FixtureOverride;
pub use songs::{Pagination, SongPatch, SongRecord, SongService, TextPage};
