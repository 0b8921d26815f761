//! Contains the settings used to set up groups and the peer ring.
//!
//! The settings are read from a **YAML** document which looks like this:
//!
//! ```yaml
//! ring:
//!     # Specifies the number of virtual nodes placed on the hash ring per peer.
//!     replicas: 50
//! groups:
//!     scores:
//!         # Specifies the maximal amount of memory to use (in bytes).
//!         # Supports common suffixes like: k, m, g, t
//!         max_memory: 2k
//! ```
//!
//! Invalid group definitions are logged and skipped, so that a single broken entry doesn't take
//! down all other groups. A document which isn't valid **YAML** at all is rejected.
//!
//! # Examples
//!
//! ```
//! # use peercache::config::Settings;
//! let settings = Settings::from_yaml("
//! ring:
//!     replicas: 20
//! groups:
//!     scores:
//!         max_memory: 64m
//!     names:
//!         max_memory: 1024
//! ").unwrap();
//!
//! assert_eq!(settings.replicas(), 20);
//! assert_eq!(settings.group("scores").unwrap().max_memory, 64 * 1024 * 1024);
//! assert_eq!(settings.group("names").unwrap().max_memory, 1024);
//! ```
use std::path::Path;

use anyhow::Context;
use yaml_rust::{Yaml, YamlLoader};

use crate::consistenthash::DEFAULT_REPLICAS;
use crate::fmt::parse_size;

/// Contains the settings of a single group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSettings {
    /// Contains the name of the group.
    pub name: String,
    /// Contains the maximal number of bytes to cache locally.
    pub max_memory: usize,
}

/// Contains the settings for all groups and the peer ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    replicas: usize,
    groups: Vec<GroupSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            replicas: DEFAULT_REPLICAS,
            groups: Vec::new(),
        }
    }
}

impl Settings {
    /// Parses the settings from the given **YAML** document.
    ///
    /// # Errors
    /// Fails if the document cannot be parsed or if the ring settings are invalid.
    pub fn from_yaml(data: &str) -> anyhow::Result<Settings> {
        let docs = YamlLoader::load_from_str(data).context("Cannot parse settings.")?;
        let doc = match docs.first() {
            Some(doc) => doc,
            None => return Ok(Settings::default()),
        };

        let replicas = match &doc["ring"]["replicas"] {
            Yaml::BadValue | Yaml::Null => DEFAULT_REPLICAS,
            Yaml::Integer(replicas) if *replicas > 0 => *replicas as usize,
            other => {
                return Err(anyhow::anyhow!(
                    "Invalid number of replicas: {:?}. Expected a positive integer.",
                    other
                ))
            }
        };

        let mut groups = Vec::new();
        if let Some(map) = doc["groups"].as_hash() {
            for (name, config) in map {
                match parse_group(name, config) {
                    Ok(group) => groups.push(group),
                    Err(error) => log::error!("Skipping invalid group definition: {:#}", error),
                }
            }
        } else {
            log::info!("Settings do not contain a 'groups' object.");
        }

        Ok(Settings { replicas, groups })
    }

    /// Reads and parses the settings from the given file.
    ///
    /// # Errors
    /// Fails if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Settings> {
        let path = path.as_ref();
        log::info!("Loading settings from {}...", path.display());

        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot load settings file {}", path.display()))?;

        Settings::from_yaml(&data)
    }

    /// Returns the number of virtual nodes to place on the hash ring per peer.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Returns the settings of the group with the given name.
    pub fn group(&self, name: &str) -> Option<&GroupSettings> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Returns the settings of all groups in the order of their definition.
    pub fn groups(&self) -> &[GroupSettings] {
        &self.groups
    }
}

fn parse_group(name: &Yaml, config: &Yaml) -> anyhow::Result<GroupSettings> {
    let name = name
        .as_str()
        .filter(|name| !name.is_empty())
        .context("A group needs a non-empty name.")?;

    let max_memory = match &config["max_memory"] {
        Yaml::Integer(max_memory) => usize::try_from(*max_memory).unwrap_or(0),
        Yaml::String(max_memory) => parse_size(max_memory)
            .with_context(|| format!("Invalid max_memory for group '{}'.", name))?,
        _ => 0,
    };
    if max_memory == 0 {
        return Err(anyhow::anyhow!(
            "Group '{}' needs a positive max_memory.",
            name
        ));
    }

    Ok(GroupSettings {
        name: name.to_owned(),
        max_memory,
    })
}

#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use crate::consistenthash::DEFAULT_REPLICAS;
    use crate::testing::test_async;

    #[test]
    fn empty_settings_use_defaults() {
        let settings = Settings::from_yaml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.replicas(), DEFAULT_REPLICAS);
        assert_eq!(settings.groups().is_empty(), true);
    }

    #[test]
    fn invalid_groups_are_skipped() {
        let settings = Settings::from_yaml(
            "
groups:
    scores:
        max_memory: 2k
    broken:
        max_memory: 1.5g
    missing:
        size: 12
    negative:
        max_memory: -1
    zero:
        max_memory: 0
    zero_kilobytes:
        max_memory: 0k
    zero_string:
        max_memory: \"0\"
",
        )
        .unwrap();

        assert_eq!(settings.groups().len(), 1);
        assert_eq!(settings.groups()[0].name, "scores");
        assert_eq!(settings.group("scores").unwrap().max_memory, 2048);
        assert_eq!(settings.group("broken"), None);
        assert_eq!(settings.group("zero"), None);
        assert_eq!(settings.group("zero_kilobytes"), None);
        assert_eq!(settings.group("zero_string"), None);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        assert_eq!(Settings::from_yaml("groups: \"test").is_err(), true);
        assert_eq!(
            Settings::from_yaml("ring:\n    replicas: many").is_err(),
            true
        );
        assert_eq!(Settings::from_yaml("ring:\n    replicas: 0").is_err(), true);
    }

    #[test]
    fn settings_can_be_loaded_from_disk() {
        test_async(async {
            let path = std::env::temp_dir().join("peercache_settings_test.yml");
            tokio::fs::write(&path, "ring:\n    replicas: 7\n").await.unwrap();

            let settings = Settings::load(&path).await.unwrap();
            assert_eq!(settings.replicas(), 7);

            tokio::fs::remove_file(&path).await.unwrap();
            assert_eq!(Settings::load(&path).await.is_err(), true);
        });
    }
}
