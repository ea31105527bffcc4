use crate::error::{FabricError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Raw attachment name -> friendly display name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    aliases: HashMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load aliases from a JSON object, or a TOML table when the extension is `.toml`.
    ///
    /// A missing file is not an error: the map is empty and raw names are used.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "Alias file {} not found; it maps attachment names to friendly VPC names. Using raw names",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let aliases: HashMap<String, String> = if is_toml {
            toml::from_str(&contents).map_err(|err| FabricError::InvalidAliases {
                path: path.display().to_string(),
                message: err.to_string(),
            })?
        } else {
            serde_json::from_str(&contents).map_err(|err| FabricError::InvalidAliases {
                path: path.display().to_string(),
                message: err.to_string(),
            })?
        };

        log::debug!("Loaded {} aliases from {}", aliases.len(), path.display());
        Ok(Self { aliases })
    }

    pub fn insert(&mut self, name: impl Into<String>, friendly: impl Into<String>) {
        self.aliases.insert(name.into(), friendly.into());
    }

    /// Friendly name for `name`, or `name` unchanged
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl FromIterator<(String, String)> for AliasMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            aliases: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_map() {
        let dir = tempdir().unwrap();
        let aliases = AliasMap::load(&dir.path().join("alias.json")).unwrap();
        assert!(aliases.is_empty());
        assert_eq!(aliases.resolve("vpc-a"), "vpc-a");
    }

    #[test]
    fn loads_json_and_toml() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("alias.json");
        std::fs::write(&json, r#"{"tgw-vpc-a": "Shared Services"}"#).unwrap();
        let toml_path = dir.path().join("alias.toml");
        std::fs::write(&toml_path, "\"tgw-vpc-a\" = \"Shared Services\"\n").unwrap();

        for path in [json, toml_path] {
            let aliases = AliasMap::load(&path).unwrap();
            assert_eq!(aliases.len(), 1);
            assert_eq!(aliases.resolve("tgw-vpc-a"), "Shared Services");
            assert_eq!(aliases.resolve("tgw-vpc-b"), "tgw-vpc-b");
        }
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alias.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = AliasMap::load(&path).unwrap_err();
        assert!(matches!(err, FabricError::InvalidAliases { .. }));
    }
}
