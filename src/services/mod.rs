pub mod auth;
pub mod bookmarks;
pub mod discovery;
pub mod feed;
pub mod providers;
pub mod search;

pub use auth::{AuthEvent, AuthProvider, MemoryAuthProvider};
pub use bookmarks::{BookmarkRepository, BookmarkState};
pub use discovery::{DiscoveryService, FeaturedMovie, StarRating};
pub use feed::{advance, spawn_viewport_driver, FeedOutcome, FeedSession, FeedTrigger, FeedView};
pub use providers::{MetadataProvider, TmdbProvider};
pub use search::{NavigationAction, QueryNavigator, QueryNavigatorHandle};
