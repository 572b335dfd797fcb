//! Resolution of configured file sets into resource descriptors.

use std::collections::HashSet;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::FileSetConfig;
use crate::error::ConfigError;

use super::descriptor::ResourceDescriptor;

const DEFAULT_INCLUDE: &str = "**";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolves every file set, in configuration order, into descriptors.
///
/// Files inside one set are ordered by path. A file reachable from two sets is
/// kept once, at its first position.
pub fn resolve_file_sets(sets: &[&FileSetConfig]) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    let mut seen = HashSet::new();
    let mut descriptors = Vec::new();

    for set in sets {
        for descriptor in resolve_file_set(set)? {
            if seen.insert(descriptor.source().to_path_buf()) {
                descriptors.push(descriptor);
            }
        }
    }

    Ok(descriptors)
}

pub fn resolve_file_set(set: &FileSetConfig) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    let Some(directory) = set.directory.as_deref() else {
        warn!("File set {:?} has no directory, skipping", set);
        return Ok(Vec::new());
    };

    let includes = compile(&set.includes, "include")?;
    let excludes = compile(&set.excludes, "exclude")?;
    let includes = if includes.is_empty() {
        compile(&[DEFAULT_INCLUDE.to_string()], "include")?
    } else {
        includes
    };

    let mut descriptors = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| ConfigError::FileSet {
            directory: directory.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative) = relative_path(directory, entry.path()) else {
            continue;
        };

        let included = includes
            .iter()
            .any(|p| p.matches_with(&relative, MATCH_OPTIONS));
        let excluded = excludes
            .iter()
            .any(|p| p.matches_with(&relative, MATCH_OPTIONS));

        if included && !excluded {
            debug!("Found resource file: {}", relative);
            descriptors.push(ResourceDescriptor::new(entry.path(), relative));
        }
    }

    info!(
        "Resolved {} files in {}",
        descriptors.len(),
        directory.display()
    );
    Ok(descriptors)
}

fn compile(patterns: &[String], kind: &'static str) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                kind,
                pattern: pattern.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
