/*!
 * Tests for file utility functionality
 */

use std::path::PathBuf;

use anyhow::Result;
use capflow::file_utils::FileManager;

use crate::common;

/// Test writing creates missing parent directories
#[test]
fn test_write_to_file_withMissingParents_shouldCreateDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("a").join("b").join("captions.srt");

    FileManager::write_to_file(&nested, "subtitle content")?;

    assert!(nested.exists());
    assert_eq!(FileManager::read_to_string(&nested)?, "subtitle content");
    Ok(())
}

/// Test overwrite semantics: a second write replaces the whole file
#[test]
fn test_write_to_file_withExistingFile_shouldOverwrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("captions.srt");

    FileManager::write_to_file(&path, "first version with more bytes")?;
    FileManager::write_to_file(&path, "second")?;

    assert_eq!(FileManager::read_to_string(&path)?, "second");
    Ok(())
}

/// Test reading a missing file surfaces an error
#[test]
fn test_read_to_string_withMissingFile_shouldFail() {
    let result = FileManager::read_to_string(PathBuf::from("/nonexistent/path/file.srt"));
    assert!(result.is_err());
}

/// Test copying a file carries its contents and creates the target directory
#[test]
fn test_copy_file_withValidSource_shouldCopyContents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_file(
        &temp_dir.path().to_path_buf(),
        "source.mp4",
        "video bytes",
    )?;
    let target = temp_dir.path().join("out").join("copy.mp4");

    FileManager::copy_file(&source, &target)?;

    assert_eq!(FileManager::read_to_string(&target)?, "video bytes");
    Ok(())
}

/// Test copying a missing source fails
#[test]
fn test_copy_file_withMissingSource_shouldFail() {
    let result = FileManager::copy_file("/nonexistent/video.mp4", "/tmp/never-written.mp4");
    assert!(result.is_err());
}

/// Test output path generation includes stem, tag, and extension
#[test]
fn test_generate_output_path_withVideoInput_shouldComposeName() {
    let path = FileManager::generate_output_path("clips/movie.mp4", "out", "captioned", "mp4");
    assert_eq!(path, PathBuf::from("out/movie.captioned.mp4"));

    let subtitle = FileManager::generate_output_path("movie.mp4", "out", "ab12cd34", "srt");
    assert_eq!(subtitle, PathBuf::from("out/movie.ab12cd34.srt"));
}

/// Test existence checks distinguish files and directories
#[test]
fn test_existence_checks_withFileAndDir_shouldDistinguish() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = common::create_test_file(&temp_dir.path().to_path_buf(), "f.txt", "x")?;

    assert!(FileManager::file_exists(&file));
    assert!(!FileManager::dir_exists(&file));
    assert!(FileManager::dir_exists(temp_dir.path()));
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}
