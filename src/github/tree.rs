use super::{GitHubClient, RepoRef};
use crate::error::{IntrospectError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

const TREE_BRANCHES: &[&str] = &["main", "master"];

/// A single entry of a recursive git tree listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Slash-delimited path from the repository root
    pub path: String,
    /// Git object type: `blob`, `tree` or `commit` (submodule)
    #[serde(rename = "type")]
    pub object_type: String,
    /// File mode
    #[serde(default)]
    pub mode: String,
    /// Object SHA
    #[serde(default)]
    pub sha: String,
    /// Size in bytes, blobs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl TreeEntry {
    /// A blob entry at `path`
    pub fn file(path: &str) -> Self {
        Self::with_type(path, "blob")
    }

    /// A tree entry at `path`
    pub fn dir(path: &str) -> Self {
        Self::with_type(path, "tree")
    }

    fn with_type(path: &str, object_type: &str) -> Self {
        Self {
            path: path.to_string(),
            object_type: object_type.to_string(),
            mode: String::new(),
            sha: String::new(),
            size: None,
        }
    }

    /// Whether this entry is a file or a directory
    pub fn kind(&self) -> NodeKind {
        if self.object_type == "tree" {
            NodeKind::Folder
        } else {
            NodeKind::File
        }
    }
}

/// Response of `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeResponse {
    /// SHA of the root tree
    #[serde(default)]
    pub sha: String,
    /// Flat list of every entry
    pub tree: Vec<TreeEntry>,
    /// Set when GitHub cut the listing short
    #[serde(default)]
    pub truncated: bool,
}

impl TreeResponse {
    /// Blob paths, one per line
    pub fn file_listing(&self) -> String {
        self.tree
            .iter()
            .filter(|entry| entry.object_type == "blob")
            .fold(String::new(), |mut listing, entry| {
                listing.push_str(&entry.path);
                listing.push('\n');
                listing
            })
    }
}

/// Kind of a node in the file hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A directory
    Folder,
    /// Anything that is not a directory
    File,
}

/// A node of the nested file hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Last path component
    pub name: String,
    /// Full slash-delimited path
    pub path: String,
    /// File or folder
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Children of a folder, directories first then by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
}

/// Builds a nested forest from a flat tree listing
///
/// Entries are indexed by path (a repeated path keeps its last kind). Each
/// entry is linked under its parent directory, or under the root when the
/// parent is absent or is not a directory. An entry with an empty path names
/// the root itself and is dropped. At every level folders come before files
/// and siblings of the same kind are ordered by name.
pub fn build_tree(entries: &[TreeEntry]) -> Vec<FileNode> {
    let index: HashMap<&str, NodeKind> = entries
        .iter()
        .map(|entry| (entry.path.as_str(), entry.kind()))
        .collect();

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for entry in entries.iter().filter(|entry| !entry.path.is_empty()) {
        let parent = match entry.path.rsplit_once('/') {
            Some((parent, _)) if index.get(parent) == Some(&NodeKind::Folder) => parent,
            _ => "",
        };
        children.entry(parent).or_default().push(entry.path.as_str());
    }

    build_level("", &index, &children)
}

fn build_level(
    parent: &str,
    index: &HashMap<&str, NodeKind>,
    children: &HashMap<&str, Vec<&str>>,
) -> Vec<FileNode> {
    let Some(paths) = children.get(parent) else {
        return Vec::new();
    };

    let mut nodes: Vec<FileNode> = paths
        .iter()
        .map(|&path| {
            let kind = index.get(path).copied().unwrap_or(NodeKind::File);
            let name = path.rsplit('/').next().unwrap_or(path);
            FileNode {
                name: name.to_string(),
                path: path.to_string(),
                kind,
                children: if kind == NodeKind::Folder {
                    build_level(path, index, children)
                } else {
                    Vec::new()
                },
            }
        })
        .collect();

    nodes.sort_by(compare_nodes);
    nodes
}

fn compare_nodes(a: &FileNode, b: &FileNode) -> Ordering {
    match (a.kind, b.kind) {
        (NodeKind::Folder, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Folder) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    }
}

impl GitHubClient {
    /// Recursive tree of the default branch, trying `main` then `master`
    pub async fn repo_tree(&self, repo: &RepoRef) -> Result<TreeResponse> {
        let mut last_error = None;
        for branch in TREE_BRANCHES {
            let url = self.repo_url(repo, &format!("/git/trees/{}?recursive=1", branch));
            match self.get_json::<TreeResponse>(&url).await {
                Ok(tree) => {
                    info!(repo = %repo, branch, entries = tree.tree.len(), truncated = tree.truncated, "fetched repository tree");
                    return Ok(tree);
                }
                Err(e) => {
                    debug!(repo = %repo, branch, error = %e, "tree fetch failed, trying next branch");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| IntrospectError::NotFound(format!("no tree for {}", repo))))
    }

    /// Nested file hierarchy of the repository
    pub async fn file_tree(&self, repo: &RepoRef) -> Result<Vec<FileNode>> {
        let tree = self.repo_tree(repo).await?;
        Ok(build_tree(&tree.tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn names(nodes: &[FileNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    fn assert_sorted(nodes: &[FileNode]) {
        for pair in nodes.windows(2) {
            assert_ne!(compare_nodes(&pair[0], &pair[1]), Ordering::Greater, "{:?} before {:?}", pair[0].path, pair[1].path);
        }
        for node in nodes {
            assert_sorted(&node.children);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(build_tree(&[]).is_empty());
    }

    #[test]
    fn test_nested_hierarchy() {
        let entries = vec![
            TreeEntry::file("README.md"),
            TreeEntry::dir("src"),
            TreeEntry::file("src/main.rs"),
            TreeEntry::dir("src/github"),
            TreeEntry::file("src/github/tree.rs"),
            TreeEntry::dir("src/github/deep"),
            TreeEntry::file("src/github/deep/leaf.rs"),
            TreeEntry::file("Cargo.toml"),
        ];

        let forest = build_tree(&entries);
        assert_eq!(names(&forest), vec!["src", "Cargo.toml", "README.md"]);

        let src = &forest[0];
        assert_eq!(src.kind, NodeKind::Folder);
        assert_eq!(names(&src.children), vec!["github", "main.rs"]);

        let github = &src.children[0];
        assert_eq!(github.path, "src/github");
        assert_eq!(names(&github.children), vec!["deep", "tree.rs"]);

        let deep = &github.children[0];
        assert_eq!(deep.children.len(), 1);
        assert_eq!(deep.children[0].path, "src/github/deep/leaf.rs");
        assert_eq!(deep.children[0].kind, NodeKind::File);
    }

    #[test]
    fn test_case_sensitive_order() {
        let forest = build_tree(&[
            TreeEntry::file("b.txt"),
            TreeEntry::file("B.txt"),
            TreeEntry::file("a.txt"),
        ]);
        assert_eq!(names(&forest), vec!["B.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_missing_parent_attaches_to_root() {
        let forest = build_tree(&[TreeEntry::file("ghost/file.rs"), TreeEntry::file("top.rs")]);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].path, "ghost/file.rs");
        assert_eq!(forest[0].name, "file.rs");
    }

    #[test]
    fn test_empty_path_is_dropped() {
        let forest = build_tree(&[TreeEntry::dir(""), TreeEntry::file("a.rs")]);
        assert_eq!(names(&forest), vec!["a.rs"]);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_child_of_file_attaches_to_root() {
        let forest = build_tree(&[TreeEntry::file("notes"), TreeEntry::file("notes/today.md")]);
        assert_eq!(names(&forest), vec!["notes", "today.md"]);
        assert_eq!(forest[1].path, "notes/today.md");
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_duplicate_paths_keep_last_kind() {
        let forest = build_tree(&[TreeEntry::file("x"), TreeEntry::dir("x")]);
        assert_eq!(forest.len(), 2);
        assert!(forest.iter().all(|n| n.kind == NodeKind::Folder));
    }

    #[test]
    fn test_submodule_is_file() {
        let mut entry = TreeEntry::file("vendor/lib");
        entry.object_type = "commit".into();
        assert_eq!(entry.kind(), NodeKind::File);
    }

    #[test]
    fn test_file_listing_skips_trees() {
        let response = TreeResponse {
            sha: String::new(),
            tree: vec![TreeEntry::dir("src"), TreeEntry::file("src/lib.rs"), TreeEntry::file("Cargo.toml")],
            truncated: false,
        };
        assert_eq!(response.file_listing(), "src/lib.rs\nCargo.toml\n");
    }

    #[test]
    fn test_serialized_shape() -> serde_json::Result<()> {
        let forest = build_tree(&[TreeEntry::dir("src"), TreeEntry::file("src/lib.rs")]);
        let value = serde_json::to_value(&forest)?;
        assert_eq!(
            value,
            serde_json::json!([{
                "name": "src",
                "path": "src",
                "type": "folder",
                "children": [{"name": "lib.rs", "path": "src/lib.rs", "type": "file"}]
            }])
        );
        Ok(())
    }

    fn arb_entries() -> impl Strategy<Value = Vec<TreeEntry>> {
        let segment = prop::sample::select(vec!["a", "b", "B", "src", "lib", "x.rs", "Z"]);
        prop::collection::vec((prop::collection::vec(segment, 1..4), any::<bool>()), 0..25).prop_map(|raw| {
            let mut entries = Vec::new();
            for (segments, is_dir) in raw {
                // emit every ancestor as a directory, as a recursive listing would
                for depth in 1..segments.len() {
                    entries.push(TreeEntry::dir(&segments[..depth].join("/")));
                }
                let path = segments.join("/");
                entries.push(if is_dir { TreeEntry::dir(&path) } else { TreeEntry::file(&path) });
            }
            entries
        })
    }

    proptest! {
        #[test]
        fn prop_every_level_sorted(entries in arb_entries()) {
            assert_sorted(&build_tree(&entries));
        }

        #[test]
        fn prop_build_is_deterministic(entries in arb_entries()) {
            prop_assert_eq!(build_tree(&entries), build_tree(&entries));
        }
    }
}
