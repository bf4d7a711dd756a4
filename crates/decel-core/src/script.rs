//! User script loading.
//!
//! Every `*.rhai` file in the configured directories is compiled once.
//! Script functions become callable from formulas and top-level `const`
//! declarations become named values.

use crate::error::{DecelError, Result};
use decel_engine::engine::{Bindings, EvalError, Value};
use rhai::{AST, Array, Dynamic, Engine, FnAccess, Scope};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_SCRIPT_FILE_BYTES: u64 = 1_048_576; // 1 MiB
const SCRIPT_EXTENSION: &str = "rhai";
/// Environment variable holding extra script directories (path-list separated).
pub const SCRIPT_DIR_ENV: &str = "DECEL_SCRIPT_DIR";

fn read_script_file(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_SCRIPT_FILE_BYTES {
        return Err(DecelError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: script file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_SCRIPT_FILE_BYTES
            ),
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Compiles user scripts into a [`Bindings`] table.
pub struct ScriptLoader {
    engine: Arc<Engine>,
    files: Vec<PathBuf>,
    bindings: Bindings,
}

impl ScriptLoader {
    pub fn new() -> Self {
        ScriptLoader {
            engine: Arc::new(Engine::new()),
            files: Vec::new(),
            bindings: Bindings::new(),
        }
    }

    /// Load every script in `dirs`, in order. Later definitions win.
    pub fn from_dirs<I, P>(dirs: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut loader = ScriptLoader::new();
        for dir in dirs {
            loader.load_dir(dir.as_ref())?;
        }
        Ok(loader)
    }

    /// Directories listed in `DECEL_SCRIPT_DIR`, if set.
    pub fn env_dirs() -> Vec<PathBuf> {
        std::env::var_os(SCRIPT_DIR_ENV)
            .map(|raw| std::env::split_paths(&raw).collect())
            .unwrap_or_default()
    }

    /// Load the `*.rhai` files directly inside `dir`, sorted by name.
    /// A missing directory loads nothing. Returns the number of files loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            log::debug!("script directory {} not found, skipping", dir.display());
            return Ok(0);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_script_file(path))
            .collect();
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }
        Ok(paths.len())
    }

    /// Compile and register one script file.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = read_script_file(path)?;
        self.load_source(path, &content)?;
        self.files.push(path.to_path_buf());
        log::info!("loaded script {}", path.display());
        Ok(())
    }

    /// Compile `source` and register its functions and constants.
    /// `path` is only used for error reporting.
    pub fn load_source(&mut self, path: &Path, source: &str) -> Result<()> {
        let script_error = |message: String| DecelError::Script {
            path: path.to_path_buf(),
            message,
        };

        let ast = self
            .engine
            .compile(source)
            .map_err(|e| script_error(e.to_string()))?;

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| script_error(e.to_string()))?;
        for (name, is_constant, value) in scope.iter() {
            if is_constant {
                self.bindings.insert_value(name, from_dynamic(value));
            }
        }

        let ast = Arc::new(ast);
        let names: Vec<String> = ast
            .iter_functions()
            .filter(|f| !matches!(f.access, FnAccess::Private))
            .map(|f| f.name.to_string())
            .collect();
        for name in names {
            if self.bindings.contains(&name) {
                log::warn!("{}: '{}' redefines an earlier script name", path.display(), name);
            }
            let engine = Arc::clone(&self.engine);
            let ast = Arc::clone(&ast);
            let fn_name = name.clone();
            self.bindings.insert_fn(name, move |args: &[Value]| {
                call_script_fn(&engine, &ast, &fn_name, args)
            });
        }
        Ok(())
    }

    /// Script files loaded so far.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Names defined by the loaded scripts only.
    pub fn script_bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Builtins with the script definitions layered on top.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::with_builtins();
        bindings.merge(self.bindings.clone());
        bindings
    }
}

impl Default for ScriptLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_script_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.') || n.starts_with("__"));
    !hidden
        && path.is_file()
        && path.extension().and_then(|e| e.to_str()) == Some(SCRIPT_EXTENSION)
}

fn call_script_fn(
    engine: &Engine,
    ast: &AST,
    name: &str,
    args: &[Value],
) -> std::result::Result<Value, EvalError> {
    let args: Vec<Dynamic> = args.iter().map(to_dynamic).collect();
    let mut scope = Scope::new();
    engine
        .call_fn::<Dynamic>(&mut scope, ast, name, args)
        .map(from_dynamic)
        .map_err(|e| EvalError::Function {
            name: name.to_string(),
            message: e.to_string(),
        })
}

fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Empty => Dynamic::UNIT,
        Value::Number(n) => Dynamic::from(*n),
        Value::Text(s) => Dynamic::from(s.clone()),
        Value::Error(_) => Dynamic::from(value.to_string()),
        Value::List(items) => Dynamic::from(items.iter().map(to_dynamic).collect::<Array>()),
    }
}

fn from_dynamic(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Empty;
    }
    if let Ok(n) = value.as_float() {
        return Value::Number(n);
    }
    if let Ok(n) = value.as_int() {
        return Value::Number(n as f64);
    }
    if let Ok(b) = value.as_bool() {
        return Value::Number(if b { 1.0 } else { 0.0 });
    }
    if value.is_string() {
        return Value::Text(value.into_string().unwrap_or_default());
    }
    if value.is_array() {
        let items = value.cast::<Array>();
        return Value::List(items.into_iter().map(from_dynamic).collect());
    }
    Value::Text(value.to_string())
}
