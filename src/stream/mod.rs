//! Subscriber-side stream utilities

mod feed;

pub use feed::FeedStream;
