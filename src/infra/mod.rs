pub mod cache;
pub mod opensubtitles;
pub mod tmdb;
