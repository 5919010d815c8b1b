pub mod dataset;

pub use dataset::{Dataset, Favourite, Settings, Source, SourceId, Track, TrackId};
