//! Cache key namespaces and derivation.

use sha2::{Digest, Sha256};

/// Intercepted API responses.
pub const API_RESPONSE_PREFIX: &str = "api_cache_";
/// Lessons pinned for offline study.
pub const LEARNING_PATH_PREFIX: &str = "learning_path_";
/// Quran text and recitation metadata.
pub const QURAN_CONTENT_PREFIX: &str = "quran_content_";
/// Per-user snapshots cached by the UI layer.
pub const USER_DATA_PREFIX: &str = "user_data_";
/// Downloaded recitation audio descriptors.
pub const AUDIO_FILES_PREFIX: &str = "audio_files_";

/// Every namespace a cache wipe is allowed to touch. Auth/session keys
/// live outside these prefixes and are never cleared here.
pub const MANAGED_PREFIXES: &[&str] = &[
  API_RESPONSE_PREFIX,
  LEARNING_PATH_PREFIX,
  QURAN_CONTENT_PREFIX,
  USER_DATA_PREFIX,
  AUDIO_FILES_PREFIX,
];

/// Marks the installation as having completed cache bootstrap.
pub const BOOTSTRAP_FLAG_KEY: &str = "cache_initialized";

/// Bearer token persisted by the auth flow.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Key for the pre-populated surah index.
pub const SURAH_INDEX_KEY: &str = "quran_content_surahs";

/// Cache key for an intercepted API response.
///
/// The raw path is hashed as written, query string included, so two
/// logically-identical requests with reordered query parameters get
/// different keys. The request method is not part of the key either; a
/// GET and a POST to the same path share an entry.
pub fn api_response_key(path: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(path.as_bytes());
  format!("{}{}", API_RESPONSE_PREFIX, hex::encode(hasher.finalize()))
}

/// Key for a surah downloaded for offline use.
pub fn surah_key(surah_id: &str) -> String {
  format!("{}surah_{}", QURAN_CONTENT_PREFIX, surah_id)
}

/// Key for a lesson downloaded for offline use.
pub fn lesson_key(lesson_id: &str) -> String {
  format!("{}lesson_{}", LEARNING_PATH_PREFIX, lesson_id)
}
