//! Interactive measurement-file picker.
//!
//! Kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the picker provides the "run `fetbias` and choose a file" UX
//!
//! The picker searches the current directory tree for files with a
//! measurement extension (`txt`, `dat`, `csv`, `tsv`).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Default directory recursion depth for finding measurement files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

const EXTENSIONS: [&str; 4] = ["txt", "dat", "csv", "tsv"];

/// Prompt the user to select a measurement file from the current directory tree.
///
/// Behavior:
/// - list discovered files
/// - accept either a number (from the list) or an explicit path
/// - `q` cancels
pub fn prompt_for_measurement_path() -> Result<PathBuf, AppError> {
    let files = discover_measurement_files();
    if files.is_empty() {
        return Err(AppError::input(
            "No measurement files found. Provide one with `fetbias design <file>`.",
        ));
    }

    println!("Found {} measurement file(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::input(format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::input(format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::input(
                "No input received. Provide a file with `fetbias design <file>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::input("Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_measurement_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_measurement_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate the provided path points to an existing file.
///
/// Any extension is accepted for an explicit path; only discovery filters by
/// extension.
pub fn validate_measurement_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::input(format!("File {} does not exist", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::input(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Discover measurement files under the current directory (deterministic order).
pub fn discover_measurement_files() -> Vec<PathBuf> {
    find_measurement_files(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_measurement_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_inner(root, 0, max_depth, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn find_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                find_inner(&path, depth + 1, max_depth, out);
            }
        } else if file_type.is_file() && has_measurement_extension(&path) {
            out.push(path);
        }
    }
}

fn has_measurement_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_filters_by_extension_and_skips_target() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("bench.txt"), "2 0.001\n").unwrap();
        fs::write(root.join("sweep.CSV"), "2,0.001\n").unwrap();
        fs::write(root.join("notes.md"), "").unwrap();
        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("target").join("skip.dat"), "").unwrap();
        fs::create_dir(root.join("runs")).unwrap();
        fs::write(root.join("runs").join("a.dat"), "").unwrap();

        let found: Vec<String> = find_measurement_files(root, 4)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found.len(), 3);
        assert!(found.contains(&"bench.txt".to_string()));
        assert!(found.contains(&"sweep.CSV".to_string()));
        assert!(found.contains(&"a.dat".to_string()));
    }

    #[test]
    fn missing_path_is_rejected() {
        let err = validate_measurement_path(Path::new("no/such/file.txt")).unwrap_err();
        assert!(err.message().contains("does not exist"));
    }
}
