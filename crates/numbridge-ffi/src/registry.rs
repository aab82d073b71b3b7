//! Process-wide registry of loaded libraries and their signatures.

use numbridge_marshal::DimensionPolicy;
use numbridge_value::Value;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::abi::EntryPoint;
use crate::error::{CallError, Result};
use crate::library::NativeLibrary;
use crate::parser::SignatureFile;
use crate::types::CallSignature;

static GLOBAL_REGISTRY: Lazy<Mutex<LibraryRegistry>> =
    Lazy::new(|| Mutex::new(LibraryRegistry::new()));

/// The shared registry used by sessions.
pub fn global_registry() -> &'static Mutex<LibraryRegistry> {
    &GLOBAL_REGISTRY
}

enum Source {
    Dynamic(NativeLibrary),
    /// Entry points linked into the current process.
    Static(HashMap<String, EntryPoint>),
}

struct LoadedLibrary {
    source: Source,
    signatures: SignatureFile,
}

impl LoadedLibrary {
    fn entry_point(&self, library: &str, function: &str) -> Result<EntryPoint> {
        match &self.source {
            // SAFETY: signatures only describe functions that follow the slot
            // convention, and the library stays loaded while registered.
            Source::Dynamic(lib) => unsafe { lib.entry_point(function) },
            Source::Static(table) => table.get(function).copied().ok_or_else(|| {
                CallError::Library(format!("Function '{function}' not registered in '{library}'"))
            }),
        }
    }
}

#[derive(Default)]
pub struct LibraryRegistry {
    libraries: HashMap<String, LoadedLibrary>,
    search_paths: Vec<PathBuf>,
    dimension_policy: DimensionPolicy,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_search_paths(&mut self, paths: Vec<PathBuf>) {
        self.search_paths = paths;
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn set_dimension_policy(&mut self, policy: DimensionPolicy) {
        self.dimension_policy = policy;
    }

    pub fn dimension_policy(&self) -> DimensionPolicy {
        self.dimension_policy
    }

    /// Load `name` and attach the signatures from `signature_path`.
    ///
    /// Loading a name that is already registered is a no-op.
    pub fn load_library(&mut self, name: &str, signature_path: impl AsRef<Path>) -> Result<()> {
        if self.libraries.contains_key(name) {
            return Ok(());
        }
        let signatures = SignatureFile::parse_file(signature_path)?;
        let library = NativeLibrary::load_by_name(name, &self.search_paths)?;
        log::debug!(
            "registered '{}' from {} with {} signature(s)",
            name,
            library.path(),
            signatures.len()
        );
        self.libraries.insert(
            name.to_string(),
            LoadedLibrary {
                source: Source::Dynamic(library),
                signatures,
            },
        );
        Ok(())
    }

    /// Register an entry point linked into this process under `library`.
    pub fn register_static(&mut self, library: &str, signature: CallSignature, entry: EntryPoint) -> Result<()> {
        signature.validate().map_err(CallError::Signature)?;
        let loaded = self
            .libraries
            .entry(library.to_string())
            .or_insert_with(|| LoadedLibrary {
                source: Source::Static(HashMap::new()),
                signatures: SignatureFile::new(),
            });
        let Source::Static(table) = &mut loaded.source else {
            return Err(CallError::Library(format!(
                "'{library}' is a dynamic library; static entry points cannot be added"
            )));
        };
        table.insert(signature.name.clone(), entry);
        loaded.signatures.insert(signature);
        Ok(())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    pub fn unload(&mut self, name: &str) -> bool {
        self.libraries.remove(name).is_some()
    }

    pub fn get_function_signature(&self, library: &str, function: &str) -> Option<&CallSignature> {
        self.libraries.get(library)?.signatures.get(function)
    }

    pub fn library_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.libraries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve the call form, marshal the arguments and run `library::function`.
    pub fn call(&self, library: &str, function: &str, args: &[Value]) -> Result<Vec<Value>> {
        self.call_with_policy(library, function, args, self.dimension_policy)
    }

    pub fn call_with_policy(
        &self,
        library: &str,
        function: &str,
        args: &[Value],
        policy: DimensionPolicy,
    ) -> Result<Vec<Value>> {
        let loaded = self
            .libraries
            .get(library)
            .ok_or_else(|| CallError::Library(format!("Library '{library}' is not loaded")))?;
        let signature = loaded.signatures.get(function).ok_or_else(|| {
            CallError::Signature(format!("No signature for '{function}' in library '{library}'"))
        })?;
        let entry = loaded.entry_point(library, function)?;
        let call = signature.resolve(args)?;
        // SAFETY: the entry point was registered or exported under this
        // signature and the library stays loaded for the duration of the call.
        unsafe { call.invoke(entry, policy) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::NativeSlot;
    use crate::parser::parse_signature_line;

    unsafe extern "C" fn negate(slots: *mut NativeSlot, count: usize) -> i32 {
        let slots = std::slice::from_raw_parts_mut(slots, count);
        let x = slots[0].scalar.real;
        slots[1].scalar.real = -x;
        0
    }

    #[test]
    fn static_entry_points_are_callable() {
        let mut registry = LibraryRegistry::new();
        let sig = parse_signature_line("negate: (real x) -> real", 1).unwrap();
        registry.register_static("builtin", sig, negate).unwrap();

        assert!(registry.is_loaded("builtin"));
        assert!(registry.get_function_signature("builtin", "negate").is_some());
        assert_eq!(
            registry.call("builtin", "negate", &[Value::Int(4)]).unwrap(),
            vec![Value::Num(-4.0)]
        );
    }

    #[test]
    fn unknown_library_and_function() {
        let registry = LibraryRegistry::new();
        let err = registry.call("nowhere", "f", &[]).unwrap_err();
        assert!(err.to_string().contains("not loaded"));

        let mut registry = LibraryRegistry::new();
        let sig = parse_signature_line("negate: (real x) -> real", 1).unwrap();
        registry.register_static("builtin", sig, negate).unwrap();
        let err = registry.call("builtin", "absent", &[]).unwrap_err();
        assert!(matches!(err, CallError::Signature(_)));
    }

    #[test]
    fn missing_signature_file_is_a_parse_error() {
        let mut registry = LibraryRegistry::new();
        let err = registry
            .load_library("whatever", "/nonexistent/whatever.ffi")
            .unwrap_err();
        assert!(matches!(err, CallError::Parse(_)));
        assert!(!registry.is_loaded("whatever"));
    }
}
