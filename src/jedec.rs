//! JEDEC fuse-map loading for the CPLD update.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::Error;

/// The line opening the fuse-map section of a JEDEC file.
const FUSE_MAP_MARKER: &str = "*L00000";

/// Loads a fuse map of `rows` rows with exactly `row_bits` bits each.
///
/// Every row is split over `parts` consecutive text lines; each line holds a
/// run of `0`/`1` characters terminated by the first other character. A row
/// that does not come out at `row_bits` bits fails the load.
pub fn load_fuse_map(
    path: &Path,
    rows: usize,
    row_bits: usize,
    parts: usize,
) -> Result<Vec<String>, Error> {
    let file = File::open(path).map_err(|_| Error::LogicFile)?;
    let mut lines = BufReader::new(file).lines();

    // Skip everything up to the fuse map.
    loop {
        match lines.next() {
            Some(Ok(line)) => {
                if line.starts_with(FUSE_MAP_MARKER) {
                    break;
                }
            }
            Some(Err(_)) | None => return Err(Error::LogicFile),
        }
    }

    let mut fuse_map = Vec::with_capacity(rows);
    for _ in 0..rows {
        let mut row = String::with_capacity(row_bits);
        for _ in 0..parts {
            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(_)) | None => return Err(Error::LogicFile),
            };
            row.extend(line.chars().take_while(|&c| c == '0' || c == '1'));
        }
        if row.len() != row_bits {
            return Err(Error::LogicFile);
        }
        fuse_map.push(row);
    }

    Ok(fuse_map)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn write_fixture(name: &str, content: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("bdisetup-jedec-{}-{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_rows_split_over_parts() {
        let path = write_fixture(
            "ok.jed",
            "JEDEC file header\n\
             QP24*\n\
             *L00000\n\
             0101*\n\
             1111*\n\
             0000*\n\
             1010*\n",
        );
        let map = load_fuse_map(&path, 2, 8, 2).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(map, vec!["01011111".to_string(), "00001010".to_string()]);
    }

    #[test]
    fn rejects_a_short_row() {
        let path = write_fixture(
            "short.jed",
            "*L00000\n\
             01*\n\
             1111*\n",
        );
        let result = load_fuse_map(&path, 1, 8, 2);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::LogicFile)));
    }

    #[test]
    fn rejects_a_file_without_a_fuse_map() {
        let path = write_fixture("empty.jed", "JEDEC file header\nQP24*\n");
        let result = load_fuse_map(&path, 1, 8, 2);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::LogicFile)));
    }
}
