//! Seed connector definitions.
//!
//! Container destinations are described by two seed documents: the
//! definitions (identity and image) and the connection specs, joined on
//! `repository:tag`. Commit destinations share one definitions document
//! and pick a spec by auth mode. Seeds are embedded at build time; an
//! extra container definitions file may be merged in from settings.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use sinkbyte_types::definition::{ConnectorDefinition, ImageRef};
use uuid::Uuid;

use crate::config::types::SharedTokenSettings;
use crate::error::{DestinationError, Result};

const CONTAINER_DEFINITIONS_YAML: &str = include_str!("../seed/container_definitions.yaml");
const CONTAINER_SPECS_YAML: &str = include_str!("../seed/container_specs.yaml");
const COMMIT_DEFINITIONS_YAML: &str = include_str!("../seed/commit_definitions.yaml");
const COMMIT_SPEC_YAML: &str = include_str!("../seed/commit_spec.yaml");
const COMMIT_SPEC_SHARED_YAML: &str = include_str!("../seed/commit_spec_shared.yaml");

#[derive(Debug, Deserialize)]
struct ContainerDefinitionSeed {
    uid: Uuid,
    id: String,
    #[serde(default)]
    title: String,
    docker_repository: String,
    docker_image_tag: String,
    #[serde(default)]
    documentation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContainerSpecSeed {
    docker_image: String,
    connection_specification: Value,
}

#[derive(Debug, Deserialize)]
struct CommitDefinitionSeed {
    uid: Uuid,
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    documentation_url: Option<String>,
}

/// Layout of an extra container definitions file.
#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    #[serde(default)]
    definitions: Vec<ContainerDefinitionSeed>,
    #[serde(default)]
    specs: Vec<ContainerSpecSeed>,
}

fn parse_yaml<T: serde::de::DeserializeOwned>(yaml: &str, what: &str) -> Result<T> {
    serde_yaml::from_str(yaml)
        .map_err(|e| DestinationError::Definitions(format!("failed to parse {what}: {e}")))
}

/// Join definitions with their specs. Definitions with no spec, or whose
/// uid was already seen, are skipped with a warning.
fn join_container(
    seeds: Vec<ContainerDefinitionSeed>,
    specs: Vec<ContainerSpecSeed>,
    seen: &mut HashSet<Uuid>,
) -> Vec<ConnectorDefinition> {
    let specs: HashMap<ImageRef, Value> = specs
        .into_iter()
        .map(|s| (ImageRef::parse(&s.docker_image), s.connection_specification))
        .collect();

    let mut definitions = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let image = ImageRef::new(seed.docker_repository, seed.docker_image_tag);
        let Some(spec) = specs.get(&image) else {
            tracing::warn!(
                definition = %seed.id,
                image = %image,
                "No connection spec for definition, skipping"
            );
            continue;
        };
        if !seen.insert(seed.uid) {
            tracing::warn!(definition = %seed.id, uid = %seed.uid, "Duplicate definition uid, skipping");
            continue;
        }
        definitions.push(ConnectorDefinition {
            uid: seed.uid,
            id: seed.id,
            title: seed.title,
            image: Some(image),
            spec: spec.clone(),
            documentation_url: seed.documentation_url,
        });
    }
    definitions
}

/// Parse container definitions from a definitions and a specs document.
///
/// # Errors
///
/// Returns [`DestinationError::Definitions`] if either document fails to parse.
pub fn container_definitions_from_str(
    definitions_yaml: &str,
    specs_yaml: &str,
) -> Result<Vec<ConnectorDefinition>> {
    let seeds: Vec<ContainerDefinitionSeed> =
        parse_yaml(definitions_yaml, "container definitions")?;
    let specs: Vec<ContainerSpecSeed> = parse_yaml(specs_yaml, "container specs")?;
    Ok(join_container(seeds, specs, &mut HashSet::new()))
}

/// Embedded container definitions, followed by those in `extra` if given.
///
/// # Errors
///
/// Returns [`DestinationError::Definitions`] if a seed or the extra file
/// cannot be read or parsed.
pub fn container_definitions(extra: Option<&Path>) -> Result<Vec<ConnectorDefinition>> {
    let seeds: Vec<ContainerDefinitionSeed> =
        parse_yaml(CONTAINER_DEFINITIONS_YAML, "container definitions")?;
    let specs: Vec<ContainerSpecSeed> = parse_yaml(CONTAINER_SPECS_YAML, "container specs")?;

    let mut seen = HashSet::new();
    let mut definitions = join_container(seeds, specs, &mut seen);

    if let Some(path) = extra {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DestinationError::Definitions(format!(
                "failed to read definitions file {}: {e}",
                path.display()
            ))
        })?;
        let file: DefinitionsFile = parse_yaml(&content, "definitions file")?;
        let added = join_container(file.definitions, file.specs, &mut seen);
        tracing::info!(
            path = %path.display(),
            count = added.len(),
            "Loaded extra container definitions"
        );
        definitions.extend(added);
    }

    Ok(definitions)
}

/// Commit definitions for the given auth mode.
///
/// Shared-token mode with an empty token loads nothing.
///
/// # Errors
///
/// Returns [`DestinationError::Definitions`] if a seed fails to parse.
pub fn commit_definitions(shared: &SharedTokenSettings) -> Result<Vec<ConnectorDefinition>> {
    let spec_yaml = if shared.enabled {
        if shared.token.is_empty() {
            tracing::warn!("Shared token mode enabled without a token, no commit definitions loaded");
            return Ok(Vec::new());
        }
        COMMIT_SPEC_SHARED_YAML
    } else {
        COMMIT_SPEC_YAML
    };
    let spec: Value = parse_yaml(spec_yaml, "commit spec")?;
    let seeds: Vec<CommitDefinitionSeed> = parse_yaml(COMMIT_DEFINITIONS_YAML, "commit definitions")?;

    let mut seen = HashSet::new();
    let mut definitions = Vec::with_capacity(seeds.len());
    for seed in seeds {
        if !seen.insert(seed.uid) {
            tracing::warn!(definition = %seed.id, uid = %seed.uid, "Duplicate definition uid, skipping");
            continue;
        }
        definitions.push(ConnectorDefinition {
            uid: seed.uid,
            id: seed.id,
            title: seed.title,
            image: None,
            spec: spec.clone(),
            documentation_url: seed.documentation_url,
        });
    }
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_container_seeds_join_with_specs() {
        let defs = container_definitions(None).unwrap();
        assert!(!defs.is_empty());
        for def in &defs {
            assert!(def.is_container_backed());
            assert_eq!(def.spec["type"], "object");
        }
        assert_eq!(defs[0].id, "airbyte-destination-local-json");
    }

    #[test]
    fn definition_without_spec_is_skipped() {
        let defs_yaml = r"
- uid: 00000000-0000-0000-0000-000000000001
  id: has-spec
  docker_repository: img/a
  docker_image_tag: '1'
- uid: 00000000-0000-0000-0000-000000000002
  id: no-spec
  docker_repository: img/b
  docker_image_tag: '1'
";
        let specs_yaml = r"
- docker_image: img/a:1
  connection_specification: { type: object }
";
        let defs = container_definitions_from_str(defs_yaml, specs_yaml).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].id, "has-spec");
    }

    #[test]
    fn untagged_spec_image_matches_latest() {
        let defs_yaml = r"
- uid: 00000000-0000-0000-0000-000000000001
  id: latest-dest
  docker_repository: localhost:5000/img
  docker_image_tag: latest
";
        let specs_yaml = "- docker_image: localhost:5000/img\n  connection_specification: {}\n";
        let defs = container_definitions_from_str(defs_yaml, specs_yaml).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(
            defs[0].image,
            Some(ImageRef::new("localhost:5000/img", "latest"))
        );
    }

    #[test]
    fn duplicate_uid_is_skipped() {
        let defs_yaml = r"
- uid: 00000000-0000-0000-0000-000000000001
  id: first
  docker_repository: img/a
  docker_image_tag: '1'
- uid: 00000000-0000-0000-0000-000000000001
  id: second
  docker_repository: img/a
  docker_image_tag: '1'
";
        let specs_yaml = "- docker_image: img/a:1\n  connection_specification: {}\n";
        let defs = container_definitions_from_str(defs_yaml, specs_yaml).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].id, "first");
    }

    #[test]
    fn malformed_seed_is_definitions_error() {
        let err = container_definitions_from_str("not: [a list", "[]").unwrap_err();
        assert!(matches!(err, DestinationError::Definitions(_)));
    }

    #[test]
    fn extra_file_is_merged_after_seeds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r"
definitions:
  - uid: 11111111-1111-1111-1111-111111111111
    id: custom-dest
    docker_repository: acme/dest
    docker_image_tag: '2.0'
specs:
  - docker_image: acme/dest:2.0
    connection_specification: {{ type: object }}
"
        )
        .unwrap();
        let seeded = container_definitions(None).unwrap().len();
        let defs = container_definitions(Some(file.path())).unwrap();
        assert_eq!(defs.len(), seeded + 1);
        assert_eq!(defs.last().unwrap().id, "custom-dest");
    }

    #[test]
    fn per_connection_spec_requires_capture_token() {
        let defs = commit_definitions(&SharedTokenSettings::default()).unwrap();
        assert_eq!(defs.len(), 1);
        assert!(defs[0].image.is_none());
        let required = defs[0].spec["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "captureToken"));
    }

    #[test]
    fn shared_token_spec_omits_capture_token() {
        let shared = SharedTokenSettings {
            enabled: true,
            token: "tok".into(),
        };
        let defs = commit_definitions(&shared).unwrap();
        assert_eq!(defs.len(), 1);
        assert!(defs[0].spec["properties"].get("captureToken").is_none());
    }

    #[test]
    fn shared_token_mode_with_empty_token_loads_nothing() {
        let shared = SharedTokenSettings {
            enabled: true,
            token: String::new(),
        };
        assert!(commit_definitions(&shared).unwrap().is_empty());
    }
}
