use regex::Regex;
use rustyline::DefaultEditor;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Result;

pub fn generate_filename(season: u32, episode: u32, episode_title: &str) -> String {
    format!(
        "{}_S{:02}E{:02}.mkv",
        sanitize_filename(episode_title),
        season,
        episode
    )
}

fn sanitize_filename(name: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    // Replace invalid filename characters
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '%' | '*' | '|' | '"' | '<' | '>' | ':' => '-',
            c => c,
        })
        .collect();

    whitespace
        .replace_all(&replaced, " ")
        .trim()
        .replace(' ', "_")
}

/// `base_filename` in `directory`, or the first free `{stem}_{n}.{ext}`.
/// The file's own current path never counts as taken.
pub fn find_unique_filename(old_path: &Path, directory: &Path, base_filename: &str) -> PathBuf {
    let base = Path::new(base_filename);
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let extension = base.extension().and_then(|s| s.to_str()).unwrap_or("mkv");

    let mut path = directory.join(base_filename);
    let mut counter = 1;
    while path.exists() && path != old_path {
        path = directory.join(format!("{stem}_{counter}.{extension}"));
        counter += 1;
    }
    path
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

pub fn confirm_rename(old_path: &Path, new_path: &Path) -> Result<bool> {
    println!(
        "Rename \"{}\" -> \"{}\"? [y/N] ",
        display_name(old_path),
        display_name(new_path)
    );

    let mut rl = DefaultEditor::new()?;
    loop {
        let input = rl.readline("").unwrap_or_default();
        let input = input.trim().to_lowercase();

        if input == "y" || input == "yes" {
            return Ok(true);
        } else if input == "n" || input == "no" || input.is_empty() {
            return Ok(false);
        } else {
            println!("Please enter 'y' or 'n'.");
        }
    }
}

/// Returns whether the file was actually moved.
pub fn rename_file(old_path: &Path, new_path: &Path, skip_confirm: bool) -> Result<bool> {
    if old_path == new_path {
        println!("File is already named correctly.");
        return Ok(false);
    }
    if !skip_confirm && !confirm_rename(old_path, new_path)? {
        println!("Skipped.");
        return Ok(false);
    }

    fs::rename(old_path, new_path)?;
    println!("Renamed successfully.");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Normal Name"), "Normal_Name");
        assert_eq!(sanitize_filename("Name/With/Slashes"), "Name-With-Slashes");
        assert_eq!(
            sanitize_filename("Name\\With\\Backslashes"),
            "Name-With-Backslashes"
        );
        assert_eq!(sanitize_filename("Name:With:Colons"), "Name-With-Colons");
        assert_eq!(sanitize_filename("Name*With*Stars"), "Name-With-Stars");
        assert_eq!(sanitize_filename("100% Done?"), "100-_Done-");
        assert_eq!(sanitize_filename("Name\"With\"Quotes"), "Name-With-Quotes");
        assert_eq!(sanitize_filename("Name<With>Angles|Pipes"), "Name-With-Angles-Pipes");
        assert_eq!(sanitize_filename("  Trim   Me  "), "Trim_Me");
        assert_eq!(sanitize_filename("Tabs\tand\nlines"), "Tabs_and_lines");
    }

    #[test]
    fn test_generate_filename() {
        assert_eq!(generate_filename(1, 1, "Pilot"), "Pilot_S01E01.mkv");
        assert_eq!(
            generate_filename(2, 15, "The End: Part 1/2"),
            "The_End-_Part_1-2_S02E15.mkv"
        );
    }

    #[test]
    fn test_find_unique_filename_no_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();
        let old_path = dir_path.join("original.mkv");
        let base_filename = "Pilot_S01E01.mkv";

        let unique_path = find_unique_filename(&old_path, dir_path, base_filename);
        assert_eq!(unique_path, dir_path.join(base_filename));
    }

    #[test]
    fn test_find_unique_filename_with_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();
        let old_path = dir_path.join("original.mkv");
        let base_filename = "Pilot_S01E01.mkv";

        File::create(dir_path.join(base_filename)).unwrap();

        let unique_path = find_unique_filename(&old_path, dir_path, base_filename);
        assert_eq!(unique_path, dir_path.join("Pilot_S01E01_1.mkv"));

        File::create(dir_path.join("Pilot_S01E01_1.mkv")).unwrap();
        let unique_path_2 = find_unique_filename(&old_path, dir_path, base_filename);
        assert_eq!(unique_path_2, dir_path.join("Pilot_S01E01_2.mkv"));
    }

    #[test]
    fn test_find_unique_filename_same_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();
        let filename = "Pilot_S01E01.mkv";
        let old_path = dir_path.join(filename);

        // Renaming a file onto its own name is not a collision.
        File::create(&old_path).unwrap();

        let unique_path = find_unique_filename(&old_path, dir_path, filename);
        assert_eq!(unique_path, old_path);
    }

    #[test]
    fn test_rename_file_without_confirmation() {
        let temp_dir = TempDir::new().unwrap();
        let old_path = temp_dir.path().join("title_t00.mkv");
        let new_path = temp_dir.path().join("Pilot_S01E01.mkv");
        File::create(&old_path).unwrap();

        assert!(rename_file(&old_path, &new_path, true).unwrap());
        assert!(!old_path.exists());
        assert!(new_path.exists());
        assert!(!rename_file(&new_path, &new_path, true).unwrap());
    }
}
