//! Typed records returned by the metadata provider, plus account types.
//!
//! Provider JSON is parsed into these types at the boundary; anything that
//! fails to parse surfaces as `AppError::MalformedResponse`.

pub mod detail;
pub mod movie;
pub mod user;

pub use detail::{
    provider_homepage, CastMember, Collection, CollectionRef, CountryReleases, Credits,
    CrewMember, ImageFile, ImageSet, MovieDetail, MovieOverview, ProductionCountry, ReleaseDate,
    ReleaseDatesResponse, RegionProviders, Video, VideoList, WatchProvider, WatchProviderResponse,
};
pub use movie::{Category, Genre, GenreList, Movie, MovieId, MoviePage};
pub use user::{Credentials, Session, SignUpForm, User};
