use std::{collections::HashMap, fs, path::PathBuf};

use log::warn;

/// Fetches the contents of included source fragments.
///
/// Resolution is batched: the result holds one entry per requested path, in order, `None`
/// standing for a path that could not be resolved.
pub trait SourceResolver {
    #[allow(missing_docs)]
    fn resolve(&self, paths: &[String]) -> Vec<Option<String>>;
}

#[derive(Clone, Debug, Default)]
/// Reads includes relative to a workspace root directory.
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    #[allow(missing_docs)]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceResolver for FsResolver {
    fn resolve(&self, paths: &[String]) -> Vec<Option<String>> {
        paths
            .iter()
            .map(|path| {
                let full = self.root.join(path);
                fs::read_to_string(&full)
                    .map_err(|err| warn!("Could not read include `{}`: {err}", full.display()))
                    .ok()
            })
            .collect()
    }
}

impl SourceResolver for HashMap<String, String> {
    fn resolve(&self, paths: &[String]) -> Vec<Option<String>> {
        paths.iter().map(|path| self.get(path).cloned()).collect()
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// Resolves nothing. Includes stay recorded but contribute no functions.
pub struct NoSources;

impl SourceResolver for NoSources {
    fn resolve(&self, paths: &[String]) -> Vec<Option<String>> {
        vec![None; paths.len()]
    }
}
