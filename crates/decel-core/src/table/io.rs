use super::Table;
use crate::error::{DecelError, Result};
use crate::storage::{decode_document, encode_document, parse_document, write_document};
use decel_engine::engine::Bindings;
use std::path::{Path, PathBuf};

const MAX_DOCUMENT_BYTES: u64 = 64 * 1_048_576; // 64 MiB

fn read_document_file(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_DOCUMENT_BYTES {
        return Err(DecelError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_DOCUMENT_BYTES
            ),
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

impl Table {
    /// Open a saved table, evaluating its formulas against `bindings`.
    pub fn open(path: &Path, bindings: Bindings) -> Result<Table> {
        let record = parse_document(&read_document_file(path)?)?;
        let mut table = decode_document(&record, bindings)?;
        table.filename = Some(path.to_path_buf());
        log::info!("loaded {} ({} cells)", path.display(), table.len());
        Ok(table)
    }

    /// Replace this table's contents with the file at `path`.
    ///
    /// The new grid is built completely before anything is replaced, so a
    /// failed load leaves the table as it was.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let table = Table::open(path, self.bindings.clone())?;
        *self = table;
        Ok(())
    }

    /// Save to the current filename.
    /// Returns the path saved to.
    pub fn save(&mut self) -> Result<PathBuf> {
        let Some(path) = self.filename.clone() else {
            return Err(DecelError::NoFilename);
        };
        self.write_to(&path)?;
        Ok(path)
    }

    /// Save to `path` and make it the current filename.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<PathBuf> {
        let path = path.into();
        self.write_to(&path)?;
        self.filename = Some(path.clone());
        Ok(path)
    }

    fn write_to(&mut self, path: &Path) -> Result<()> {
        let json = write_document(&encode_document(self)?)?;
        std::fs::write(path, json)?;
        self.modified = false;
        log::info!("saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decel_engine::engine::{CellRef, Value};

    struct Cleanup(PathBuf);

    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn temp_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "decel_{}_{}_{}_{:?}.json",
            tag,
            std::process::id(),
            nanos,
            std::thread::current().id()
        ))
    }

    fn cell(name: &str) -> CellRef {
        CellRef::from_str(name).unwrap()
    }

    #[test]
    fn test_save_without_filename() {
        let mut table = Table::new();
        assert!(matches!(table.save(), Err(DecelError::NoFilename)));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = temp_path("round_trip");
        let _cleanup = Cleanup(path.clone());

        let mut table = Table::new();
        table.set_value(cell("A1"), Value::Number(1.5));
        table.set_value(cell("A2"), Value::text("007"));
        table.set_formula(cell("B1"), "A1 * 2").unwrap();
        table.fill(cell("B1"), cell("B2"), cell("B2"));
        table.propagate();
        assert_eq!(table.save_as(&path).unwrap(), path);
        assert!(!table.is_modified());

        let mut loaded = Table::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.filename(), Some(path.as_path()));
        assert_eq!(loaded.get_value(cell("A1")), Value::Number(1.5));
        assert_eq!(loaded.get_value(cell("A2")), Value::text("007"));
        assert_eq!(loaded.get_value(cell("B1")), Value::Number(3.0));
        assert_eq!(loaded.formula_text(cell("B2")), "A2 * 2");
        assert!(loaded.get_value(cell("B2")).is_error());

        loaded.set_value(cell("A1"), Value::Number(10.0));
        loaded.propagate();
        loaded.save().unwrap();
        let again = Table::open(&path, Bindings::with_builtins()).unwrap();
        assert_eq!(again.stored_value(cell("B1")), Value::Number(20.0));
    }

    #[test]
    fn test_round_trip_keeps_lists_and_non_finite_numbers() {
        let path = temp_path("special_values");
        let _cleanup = Cleanup(path.clone());

        let mut table = Table::new();
        table.set_text_value(cell("A1"), "[1, 2]");
        table.set_text_value(cell("B1"), "sqrt(-1)");
        table.set_text_value(cell("C1"), "10 ** 400");
        table.set_value(cell("D1"), Value::Number(f64::NEG_INFINITY));
        table.save_as(&path).unwrap();

        let loaded = Table::open(&path, Bindings::with_builtins()).unwrap();
        assert_eq!(loaded.stored_value(cell("A1")), Value::text("[1, 2]"));
        assert!(matches!(loaded.stored_value(cell("B1")), Value::Number(n) if n.is_nan()));
        assert_eq!(loaded.stored_value(cell("C1")), Value::Number(f64::INFINITY));
        assert_eq!(loaded.stored_value(cell("D1")), Value::Number(f64::NEG_INFINITY));
    }

    #[test]
    fn test_failed_load_keeps_table() {
        let path = temp_path("bad");
        let _cleanup = Cleanup(path.clone());
        std::fs::write(&path, "{ not json").unwrap();

        let mut table = Table::new();
        table.set_value(cell("A1"), Value::Number(1.0));
        assert!(matches!(table.load(&path), Err(DecelError::Json(_))));
        assert_eq!(table.get_value(cell("A1")), Value::Number(1.0));
        assert!(!table.has_filename());
    }

    #[test]
    fn test_load_missing_file() {
        let mut table = Table::new();
        let path = temp_path("missing");
        assert!(matches!(table.load(&path), Err(DecelError::Io(_))));
    }
}
