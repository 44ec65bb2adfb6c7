use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use filestore_transfer::ResolvedFile;

use crate::types::{DuplicateGroup, DuplicatePolicy};

/// Groups files by content fingerprint, keeping only groups with more than
/// one member. Groups and members follow input order; unhashable files are
/// never grouped.
pub fn find_duplicate_groups(files: &[ResolvedFile]) -> Vec<DuplicateGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for file in files {
        let Some(key) = file.fingerprint.dedup_key() else {
            continue;
        };
        match index.get(key) {
            Some(&i) => groups[i].files.push(file.path.clone()),
            None => {
                index.insert(key, groups.len());
                groups.push(DuplicateGroup {
                    content_hash: key.to_string(),
                    files: vec![file.path.clone()],
                });
            }
        }
    }

    groups.retain(|g| g.files.len() > 1);
    groups
}

/// Splits `files` into those to upload and those skipped as duplicates.
///
/// A path listed more than once is uploaded once under every policy.
/// [`DuplicatePolicy::Skip`] additionally drops files whose content was
/// already seen.
pub(crate) fn partition(
    files: Vec<ResolvedFile>,
    policy: DuplicatePolicy,
) -> (Vec<ResolvedFile>, Vec<PathBuf>) {
    let mut seen_paths: HashSet<PathBuf> = HashSet::new();
    let mut seen_content: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for file in files {
        let key = std::fs::canonicalize(&file.path).unwrap_or_else(|_| file.path.clone());
        let new_path = seen_paths.insert(key);
        let new_content = policy == DuplicatePolicy::UploadAll
            || match file.fingerprint.dedup_key() {
                Some(hash) => seen_content.insert(hash.to_string()),
                None => true,
            };
        if new_path && new_content {
            keep.push(file);
        } else {
            skipped.push(file.path);
        }
    }

    (keep, skipped)
}
