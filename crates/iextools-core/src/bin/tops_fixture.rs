use std::fs;
use std::path::{Path, PathBuf};

use iextools_core::fixture::{length_mismatch_capture, session_capture};

const DEFAULT_ROOT: &str = "tests/golden";

fn main() -> Result<(), String> {
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));
    write_capture(&root.join("tops_session").join("input.pcapng"), session_capture())?;
    write_capture(
        &root.join("tops_length_mismatch").join("input.pcapng"),
        length_mismatch_capture(),
    )?;
    Ok(())
}

fn write_capture(path: &Path, data: Vec<u8>) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
    }
    fs::write(path, data).map_err(|err| format!("failed to write {}: {}", path.display(), err))?;
    println!("wrote {}", path.display());
    Ok(())
}
