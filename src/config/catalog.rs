//! Media and sticker catalog configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{read_yaml, save_yaml, ConfigError, AFTERNOON_MEDIA_POOL, MORNING_MEDIA_POOL};

/// A single media item: a file on disk plus an optional caption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaItem {
    /// Unique identifier of the item within its pool.
    pub uid: u32,

    /// Path of the media file, relative to the media directory.
    pub path: PathBuf,

    /// Caption to send alongside the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl MediaItem {
    /// Creates a new media item.
    #[must_use]
    pub fn new(uid: u32, path: impl Into<PathBuf>) -> Self {
        Self {
            uid,
            path: path.into(),
            caption: None,
        }
    }
}

/// A sticker file. Stickers carry no caption and no send-tracking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StickerItem {
    /// Unique identifier of the sticker within its pool.
    pub uid: u32,

    /// Path of the sticker file, relative to the media directory.
    pub path: PathBuf,
}

/// Catalog of media items, one pool per scheduled action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaCatalog {
    /// Items sent with the morning greeting.
    #[serde(default)]
    pub morning_media: Vec<MediaItem>,

    /// Items sent on the afternoon schedule.
    #[serde(default)]
    pub afternoon_media: Vec<MediaItem>,
}

impl MediaCatalog {
    /// Loads the catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_yaml(path)
    }

    /// Saves the catalog to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        save_yaml(self, path)
    }

    /// Returns the pool with the given name, if it exists.
    #[must_use]
    pub fn pool(&self, name: &str) -> Option<&[MediaItem]> {
        match name {
            MORNING_MEDIA_POOL => Some(&self.morning_media),
            AFTERNOON_MEDIA_POOL => Some(&self.afternoon_media),
            _ => None,
        }
    }

    /// Returns all pool names and their items, in a fixed order.
    #[must_use]
    pub fn pools(&self) -> [(&'static str, &[MediaItem]); 2] {
        [
            (MORNING_MEDIA_POOL, self.morning_media.as_slice()),
            (AFTERNOON_MEDIA_POOL, self.afternoon_media.as_slice()),
        ]
    }

    /// Validates the catalog: uids unique per pool, paths non-empty.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (pool, items) in self.pools() {
            validate_pool(pool, items.iter().map(|m| (m.uid, m.path.as_path())))?;
        }
        Ok(())
    }

    /// Creates an example catalog for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self {
            morning_media: vec![
                MediaItem::new(1, "sunrise.jpg"),
                MediaItem {
                    uid: 2,
                    path: PathBuf::from("coffee.mp4"),
                    caption: Some("good morning!".to_owned()),
                },
            ],
            afternoon_media: vec![MediaItem::new(1, "park.jpg")],
        }
    }
}

/// Catalog of sticker items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StickerCatalog {
    /// Stickers sent with the morning greeting.
    #[serde(default)]
    pub morning_stickers: Vec<StickerItem>,
}

impl StickerCatalog {
    /// Loads the catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_yaml(path)
    }

    /// Saves the catalog to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        save_yaml(self, path)
    }

    /// Validates the catalog: uids unique, paths non-empty.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pool(
            "morning_stickers",
            self.morning_stickers.iter().map(|s| (s.uid, s.path.as_path())),
        )
    }

    /// Creates an example catalog for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self {
            morning_stickers: vec![
                StickerItem {
                    uid: 1,
                    path: PathBuf::from("wave.webp"),
                },
                StickerItem {
                    uid: 2,
                    path: PathBuf::from("sun.webp"),
                },
            ],
        }
    }
}

fn validate_pool<'a>(
    pool: &str,
    items: impl Iterator<Item = (u32, &'a Path)>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (uid, path) in items {
        if !seen.insert(uid) {
            return Err(ConfigError::DuplicateUid {
                pool: pool.to_owned(),
                uid,
            });
        }
        if path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath {
                pool: pool.to_owned(),
                uid,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_catalogs_validate() {
        assert!(MediaCatalog::example().validate().is_ok());
        assert!(StickerCatalog::example().validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_uid() {
        let catalog = MediaCatalog {
            morning_media: vec![MediaItem::new(1, "a.jpg"), MediaItem::new(1, "b.jpg")],
            afternoon_media: vec![],
        };
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::DuplicateUid { uid: 1, .. })
        ));
    }

    #[test]
    fn test_uids_unique_per_pool_not_globally() {
        let catalog = MediaCatalog {
            morning_media: vec![MediaItem::new(1, "a.jpg")],
            afternoon_media: vec![MediaItem::new(1, "b.jpg")],
        };
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_path() {
        let catalog = MediaCatalog {
            morning_media: vec![MediaItem::new(3, "")],
            afternoon_media: vec![],
        };
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::EmptyPath { uid: 3, .. })
        ));
    }

    #[test]
    fn test_parse_yaml_pools() {
        let yaml = "\
morning_media:
  - uid: 1
    path: sunrise.jpg
afternoon_media:
  - uid: 7
    path: park.jpg
    caption: look at this
";
        let catalog: MediaCatalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(catalog.morning_media.len(), 1);
        assert_eq!(catalog.afternoon_media[0].uid, 7);
        assert_eq!(
            catalog.afternoon_media[0].caption.as_deref(),
            Some("look at this")
        );
    }

    #[test]
    fn test_pool_lookup() {
        let catalog = MediaCatalog::example();
        assert_eq!(catalog.pool("morning_media").map(<[MediaItem]>::len), Some(2));
        assert!(catalog.pool("unknown").is_none());
    }
}
