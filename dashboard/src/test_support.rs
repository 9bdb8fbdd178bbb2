//! Test utilities for the dashboard crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or when the
//! `test-support` feature is enabled.

pub mod gateway;
pub mod timing;

pub mod cap_fs {
    //! Capability-safe filesystem helpers for export tests.

    use std::io;
    use std::path::Path;

    use cap_std::{ambient_authority, fs::Dir};

    /// Read a UTF-8 file named `file_name` inside `directory`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cap_std::{ambient_authority, fs::Dir};
    /// use dashboard::test_support::cap_fs::read_file_to_string;
    ///
    /// let directory = std::env::temp_dir().join("dashboard-cap-fs-example");
    /// Dir::create_ambient_dir_all(&directory, ambient_authority())?;
    /// Dir::open_ambient_dir(&directory, ambient_authority())?.write("note.md", b"hello\n")?;
    ///
    /// assert_eq!(read_file_to_string(&directory, "note.md")?, "hello\n");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn read_file_to_string(directory: &Path, file_name: &str) -> io::Result<String> {
        let directory = Dir::open_ambient_dir(directory, ambient_authority())?;
        directory.read_to_string(file_name)
    }

    /// List the entry names inside `directory`, sorted.
    pub fn list_file_names(directory: &Path) -> io::Result<Vec<String>> {
        let directory = Dir::open_ambient_dir(directory, ambient_authority())?;
        let mut names = Vec::new();
        for entry in directory.entries()? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
