use std::{fs, io, path::Path};

use crate::models::{Db, now_fixed_offset};

/// Read the database file. A missing file is an empty database.
/// Legacy task shapes are normalized on the way in.
pub fn load_db(path: &Path) -> io::Result<Db> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Db::default()),
        Err(e) => return Err(e),
    };
    let mut db: Db =
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let now = now_fixed_offset();
    for task in db.tasks.iter_mut() {
        task.normalize(now);
    }
    Ok(db)
}

/// Write via temp file + rename so readers never see a half-written file.
pub fn save_db(path: &Path, db: &Db) -> io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(db)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&tmp_path, text)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
