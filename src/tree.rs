//! Directory tree rendering.
//!
//! Produces the familiar box-drawing layout:
//!
//! ```text
//! └── project
//!     ├── docs
//!     │   └── guide.md
//!     └── README.md
//! ```
//!
//! Subdirectories come before files, each group sorted by name. Symbolic
//! links below the root are listed but never followed. Listing errors become inline marker
//! lines so one unreadable directory does not abort the whole render.

use chrono::Local;
use log::{error, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the snapshot written by the organize pipeline.
pub const SNAPSHOT_FILE_NAME: &str = "directory_tree.txt";

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE_INDENT: &str = "│   ";
const SPACE_INDENT: &str = "    ";

/// Renders `path` and its contents down to `max_depth` levels below it.
///
/// A directory at exactly `max_depth` still lists its files but none of its
/// subdirectories. `None` renders the full tree.
pub fn render_tree(path: &Path, max_depth: Option<usize>) -> String {
    let mut output = String::new();
    render_node(path, "", true, max_depth, 0, &mut output);
    output
}

/// Writes a timestamped snapshot of the tree at `dir` to `output_file`.
pub fn write_snapshot(dir: &Path, output_file: &Path, max_depth: Option<usize>) -> std::io::Result<()> {
    let tree = render_tree(dir, max_depth);
    let contents = format!(
        "Directory tree generated on: {}\n{}\n{}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(50),
        tree
    );
    fs::write(output_file, contents)
}

/// Like [`write_snapshot`], but logs instead of returning the error.
///
/// Returns true if the snapshot was written.
pub fn save_tree(dir: &Path, output_file: &Path, max_depth: Option<usize>) -> bool {
    match write_snapshot(dir, output_file, max_depth) {
        Ok(()) => {
            info!("Directory tree saved to: {}", output_file.display());
            true
        }
        Err(e) => {
            error!("Error saving directory tree to {}: {}", output_file.display(), e);
            false
        }
    }
}

fn exceeds(depth: usize, max_depth: Option<usize>) -> bool {
    max_depth.is_some_and(|max| depth > max)
}

fn render_node(
    path: &Path,
    prefix: &str,
    is_last: bool,
    max_depth: Option<usize>,
    depth: usize,
    output: &mut String,
) {
    if exceeds(depth, max_depth) {
        return;
    }

    push_line(output, prefix, is_last, &display_name(path));

    // The root is followed if it is a symlink; nested links are not.
    let metadata = if depth == 0 {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    };
    if !metadata.map(|m| m.is_dir()).unwrap_or(false) {
        return;
    }

    let child_prefix = format!("{}{}", prefix, if is_last { SPACE_INDENT } else { PIPE_INDENT });

    match list_children(path) {
        Ok((mut dirs, files)) => {
            // Subdirectories past the bound print nothing; files always do.
            if exceeds(depth + 1, max_depth) {
                dirs.clear();
            }
            let total = dirs.len() + files.len();
            for (i, dir) in dirs.iter().enumerate() {
                let last = i + 1 == total;
                render_node(dir, &child_prefix, last, max_depth, depth + 1, output);
            }
            for (i, file) in files.iter().enumerate() {
                let last = dirs.len() + i + 1 == total;
                push_line(output, &child_prefix, last, &display_name(file));
            }
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            output.push_str(&child_prefix);
            output.push_str("[Access denied]\n");
        }
        Err(e) => {
            output.push_str(&child_prefix);
            output.push_str(&format!("[Error: {}]\n", e));
        }
    }
}

fn push_line(output: &mut String, prefix: &str, is_last: bool, name: &str) {
    output.push_str(prefix);
    output.push_str(if is_last { LAST_BRANCH } else { BRANCH });
    output.push_str(name);
    output.push('\n');
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Splits the entries of `dir` into (subdirectories, other entries), each
/// sorted by name.
fn list_children(dir: &Path) -> std::io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            dirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }

    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok((dirs, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root_name(temp_dir: &TempDir) -> String {
        display_name(temp_dir.path())
    }

    #[test]
    fn test_subdirectories_before_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::write(temp_dir.path().join("b.txt"), "b").unwrap();

        let tree = render_tree(temp_dir.path(), None);
        let expected = format!("└── {}\n    ├── a\n    └── b.txt\n", root_name(&temp_dir));
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_nested_prefixes() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("docs/img")).unwrap();
        fs::write(root.join("docs/guide.md"), "g").unwrap();
        fs::write(root.join("docs/img/logo.png"), "l").unwrap();
        fs::create_dir(root.join("src")).unwrap();
        fs::write(root.join("src/main.rs"), "m").unwrap();
        fs::write(root.join("README.md"), "r").unwrap();

        let tree = render_tree(root, None);
        let expected = format!(
            "└── {}\n\
             \x20   ├── docs\n\
             \x20   │   ├── img\n\
             \x20   │   │   └── logo.png\n\
             \x20   │   └── guide.md\n\
             \x20   ├── src\n\
             \x20   │   └── main.rs\n\
             \x20   └── README.md\n",
            root_name(&temp_dir)
        );
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_empty_directory_is_last_entry() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("only")).unwrap();

        let tree = render_tree(temp_dir.path(), None);
        assert!(tree.ends_with("    └── only\n"));
    }

    #[test]
    fn test_max_depth_limits_output() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/inner.txt"), "i").unwrap();
        fs::write(root.join("a/b/deep.txt"), "d").unwrap();
        fs::write(root.join("top.txt"), "t").unwrap();

        let name = root_name(&temp_dir);

        // The root sits at the bound: its files stay, its folders go.
        assert_eq!(
            render_tree(root, Some(0)),
            format!("└── {}\n    └── top.txt\n", name)
        );

        assert_eq!(
            render_tree(root, Some(1)),
            format!(
                "└── {}\n    ├── a\n    │   └── inner.txt\n    └── top.txt\n",
                name
            )
        );

        let depth_two = render_tree(root, Some(2));
        assert!(depth_two.contains("├── b\n"));
        assert!(depth_two.contains("deep.txt"));

        assert!(render_tree(root, None).contains("deep.txt"));
    }

    #[test]
    fn test_bound_connector_uses_printed_entries() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::create_dir(root.join("z_dir")).unwrap();

        let tree = render_tree(root, Some(0));
        assert!(tree.ends_with("    └── a.txt\n"));
        assert!(!tree.contains("z_dir"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_is_followed() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("a.txt"), "a").unwrap();
        fs::create_dir(real.join("inner")).unwrap();
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        std::os::unix::fs::symlink(&real, real.join("inner/loop")).unwrap();

        let tree = render_tree(&link, None);
        assert_eq!(
            tree,
            "└── link\n    ├── inner\n    │   └── loop\n    └── a.txt\n"
        );
    }

    #[test]
    fn test_plain_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("single.txt");
        fs::write(&file, "x").unwrap();

        assert_eq!(render_tree(&file, None), "└── single.txt\n");
    }

    #[test]
    fn test_missing_path_renders_single_line() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");

        // Not a directory, so only its own line is emitted.
        assert_eq!(render_tree(&missing, None), "└── gone\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_access_denied_marker_keeps_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let locked = root.join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("secret.txt"), "s").unwrap();
        fs::create_dir(root.join("open")).unwrap();
        fs::write(root.join("open/visible.txt"), "v").unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let readable = fs::read_dir(&locked).is_ok();
        let tree = render_tree(root, None);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if readable {
            // Running with elevated privileges; permissions are not enforced.
            return;
        }
        assert!(tree.contains("├── locked\n    │   [Access denied]\n"));
        assert!(tree.contains("visible.txt"));
        assert!(!tree.contains("secret.txt"));
    }

    #[test]
    fn test_write_snapshot_header() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        let output = temp_dir.path().join("tree.txt");

        assert!(save_tree(temp_dir.path(), &output, None));

        let content = fs::read_to_string(&output).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("Directory tree generated on: "));
        assert_eq!(lines.next().unwrap(), "=".repeat(50));
        assert!(lines.next().unwrap().starts_with("└── "));
        assert_eq!(lines.next().unwrap(), "    └── a.txt");
    }

    #[test]
    fn test_save_tree_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("missing_dir").join("tree.txt");
        assert!(!save_tree(temp_dir.path(), &output, None));
    }
}
