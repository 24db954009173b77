//! External service clients
//!
//! - MusicBrainz: artist canonicalization and metadata enrichment
//! - Spotify: artist/track lookup and playlist creation

pub mod musicbrainz;
pub mod spotify;

pub use musicbrainz::MusicBrainzClient;
pub use spotify::SpotifyClient;
