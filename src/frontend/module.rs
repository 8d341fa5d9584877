//! Input loading for viewc
//!
//! Reads parser-output files (JSON), follows their imports and folds all of
//! them into one `Program`. Nothing is checked until every file is loaded,
//! since child component contracts need the full component set.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::frontend::ast::Program;
use crate::utils::{Error, Result, Span};

/// One loaded input file
#[derive(Debug, Clone)]
pub struct ParsedModule {
    /// Path to the module file
    pub path: PathBuf,
    pub program: Program,
}

/// Loads input files and their imports, each at most once
#[derive(Default)]
pub struct ModuleLoader {
    modules: Vec<ParsedModule>,
    loaded: HashSet<PathBuf>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file and, transitively, everything it imports
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !self.loaded.insert(key) {
            return Ok(());
        }
        let source = fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        let program: Program = serde_json::from_str(&source)
            .map_err(|e| Error::Input(format!("{}: {}", path.display(), e)))?;
        log::debug!(
            "loaded {} ({} components, {} imports)",
            path.display(),
            program.components.len(),
            program.imports.len()
        );

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let imports: Vec<PathBuf> = program.imports.iter().map(|i| base.join(i)).collect();
        self.modules.push(ParsedModule { path: path.to_path_buf(), program });
        for import in imports {
            self.load_file(&import)?;
        }
        Ok(())
    }

    /// Add an already parsed module (imports are not followed)
    pub fn add_module(&mut self, path: impl Into<PathBuf>, program: Program) {
        self.modules.push(ParsedModule { path: path.into(), program });
    }

    pub fn modules(&self) -> &[ParsedModule] {
        &self.modules
    }

    /// Fold every loaded module into one program.
    ///
    /// Component, struct and enum names are global; a name defined twice is
    /// an error naming the second definition.
    pub fn into_program(self) -> Result<Program> {
        let mut program = Program::default();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut claim = |name: &str, path: &Path, span: Span| -> Result<()> {
            if let Some(first) = seen.get(name) {
                log::debug!("'{}' already defined in {}", name, first.display());
                return Err(Error::DuplicateDefinition { name: name.to_string(), span });
            }
            seen.insert(name.to_string(), path.to_path_buf());
            Ok(())
        };

        for module in self.modules {
            for c in &module.program.components {
                claim(&c.name, &module.path, c.span)?;
            }
            for s in &module.program.structs {
                claim(&s.name, &module.path, s.span)?;
            }
            for e in &module.program.enums {
                claim(&e.name, &module.path, e.span)?;
            }
            program.components.extend(module.program.components);
            program.structs.extend(module.program.structs);
            program.enums.extend(module.program.enums);
        }
        Ok(program)
    }
}

/// Load and fold a list of input files
pub fn load_program(paths: &[PathBuf]) -> Result<Program> {
    let mut loader = ModuleLoader::new();
    for path in paths {
        loader.load_file(path)?;
    }
    loader.into_program()
}
