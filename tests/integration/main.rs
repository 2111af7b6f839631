//! Integration tests: the full pipeline against mock and file feeds.

mod mock_feed;
mod pipeline;
