// Ensemble Library - one canonical copy per playlist, exported to every OS/format combo
// Edit a playlist anywhere, the newest copy wins and the rest get regenerated

pub mod config;    // ensemble.toml loading and validation
pub mod playlist;  // canonical lists, path styles, M3U/PLS codec
pub mod sync;      // directory layout and the update pass

// Export the stuff other modules actually use
pub use config::{Config, ConfigError, CONFIG_FILE_NAME};
pub use playlist::{CanonicalPlaylist, Format, FormatSyntax, OsProfile, PathStyle};
pub use sync::{FormatLayout, PassReport, Synchronizer, Target};
