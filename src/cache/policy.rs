//! Path classification for response caching.
//!
//! Pure prefix matching over a fixed table: exclusions first, then the
//! content classes, first match wins. No I/O, no clock.

use chrono::Duration;

/// TTL for reference data with no dedicated class (subscription plans,
/// pronunciation metadata).
pub fn default_ttl() -> Duration {
  Duration::hours(24)
}

/// TTL for learning-path content.
pub fn learning_path_ttl() -> Duration {
  Duration::days(7)
}

/// TTL for Quran content, which effectively never changes.
pub fn quran_content_ttl() -> Duration {
  Duration::days(30)
}

/// Whether a response for a path should be cached, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
  /// Never cache this path.
  Skip,
  /// Cache with the given time-to-live.
  Store { ttl: Duration },
}

#[derive(Clone, Copy)]
enum TtlClass {
  Never,
  QuranContent,
  LearningPath,
  Default,
}

/// Ordered rules; auth and self-profile exclusions are checked before the
/// content prefixes on purpose.
const RULES: &[(&str, TtlClass)] = &[
  ("/api/auth/", TtlClass::Never),
  ("/api/users/me", TtlClass::Never),
  ("/api/quran/", TtlClass::QuranContent),
  ("/api/learning-paths/", TtlClass::LearningPath),
  ("/api/pronunciation/", TtlClass::Default),
  ("/api/subscriptions/plans", TtlClass::Default),
];

/// Classify a request path.
pub fn classify(path: &str) -> CacheDecision {
  for (prefix, class) in RULES {
    if path.starts_with(prefix) {
      return match class {
        TtlClass::Never => CacheDecision::Skip,
        TtlClass::QuranContent => CacheDecision::Store {
          ttl: quran_content_ttl(),
        },
        TtlClass::LearningPath => CacheDecision::Store {
          ttl: learning_path_ttl(),
        },
        TtlClass::Default => CacheDecision::Store { ttl: default_ttl() },
      };
    }
  }

  CacheDecision::Skip
}
