use numbridge_ffi::{
    global_registry, CallError, CallSignature, EntryPoint, LibraryRegistry, NativeLibrary,
    Objective, RcommOutcome, ReverseCommunication, StepFn, Value,
};
use numbridge_logging::{init_logging, with_call_span, LoggingGuard, LoggingOptions};
use log::warn;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::config::{ConfigLoader, NumbridgeConfig};

fn lock(registry: &Mutex<LibraryRegistry>) -> Result<MutexGuard<'_, LibraryRegistry>, CallError> {
    registry
        .lock()
        .map_err(|_| CallError::Library("library registry lock poisoned".to_string()))
}

/// Append `extra` to the registry's search paths, skipping duplicates.
fn merge_search_paths(
    registry: &Mutex<LibraryRegistry>,
    extra: &[PathBuf],
) -> Result<(), CallError> {
    let mut reg = lock(registry)?;
    let mut paths = reg.search_paths().to_vec();
    for path in extra {
        if !paths.contains(path) {
            paths.push(path.clone());
        }
    }
    reg.set_search_paths(paths);
    Ok(())
}

/// Configuration, logging and the library registry in one place.
pub struct Session {
    config: NumbridgeConfig,
    registry: &'static Mutex<LibraryRegistry>,
    _logging: Option<LoggingGuard>,
}

impl Session {
    /// Session over the process-wide registry. Configured search paths are
    /// added to the registry's.
    pub fn new(config: NumbridgeConfig) -> Self {
        let registry = global_registry();
        if let Err(e) = merge_search_paths(registry, &config.ffi.search_paths) {
            warn!("configured library search paths were not applied: {e}");
        }
        Self {
            config,
            registry,
            _logging: None,
        }
    }

    /// Load configuration from files and environment, and start logging.
    pub fn from_environment() -> anyhow::Result<Self> {
        let config = ConfigLoader::load()?;
        Ok(Self::new(config).with_logging())
    }

    pub fn with_logging(mut self) -> Self {
        self._logging = Some(init_logging(LoggingOptions {
            default_filter: self.config.logging.level.as_filter().to_string(),
            stderr: self.config.logging.stderr,
        }));
        self
    }

    pub fn config(&self) -> &NumbridgeConfig {
        &self.config
    }

    fn registry(&self) -> Result<MutexGuard<'static, LibraryRegistry>, CallError> {
        lock(self.registry)
    }

    /// Load `library`, finding `<library>.ffi` in the signature directory or
    /// next to the library in a search path.
    pub fn load(&self, library: &str) -> Result<(), CallError> {
        let path = self.find_signature_file(library).ok_or_else(|| {
            CallError::Library(format!("No signature file '{library}.ffi' found"))
        })?;
        self.load_with_signatures(library, path)
    }

    pub fn load_with_signatures(
        &self,
        library: &str,
        signature_path: impl AsRef<Path>,
    ) -> Result<(), CallError> {
        self.registry()?.load_library(library, signature_path)
    }

    /// Register an entry point linked into this process.
    pub fn register(
        &self,
        library: &str,
        signature: CallSignature,
        entry: EntryPoint,
    ) -> Result<(), CallError> {
        self.registry()?.register_static(library, signature, entry)
    }

    fn find_signature_file(&self, library: &str) -> Option<PathBuf> {
        let file_name = format!("{library}.ffi");
        self.config
            .ffi
            .signature_dir
            .iter()
            .chain(self.config.ffi.search_paths.iter())
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.exists())
    }

    /// Call `library::function` with dynamic arguments.
    pub fn call(
        &self,
        library: &str,
        function: &str,
        args: &[Value],
    ) -> Result<Vec<Value>, CallError> {
        let policy = self.config.marshal.dimension_policy;
        with_call_span(library, function, || {
            self.registry()?
                .call_with_policy(library, function, args, policy)
        })
    }

    /// Call a function declared with exactly one output.
    pub fn call_single(
        &self,
        library: &str,
        function: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let mut outputs = self.call(library, function, args)?;
        match outputs.len() {
            1 => Ok(outputs.remove(0)),
            n => Err(CallError::Signature(format!(
                "'{function}' returns {n} outputs, expected one"
            ))),
        }
    }

    /// Run a reverse-communication routine exported as `step` by `library`.
    ///
    /// # Safety
    ///
    /// The exported symbol must be a [`StepFn`] and `state` must be whatever
    /// that routine expects.
    pub unsafe fn optimize<O: Objective>(
        &self,
        library: &NativeLibrary,
        step: &str,
        state: *mut c_void,
        x0: &Value,
        objective: &mut O,
    ) -> Result<RcommOutcome, CallError> {
        let step = *library.get_function::<StepFn>(step)?;
        self.run_step(step, state, x0, objective)
    }

    /// Drive an in-process step function.
    ///
    /// # Safety
    ///
    /// See [`ReverseCommunication::run`].
    pub unsafe fn run_step<O: Objective>(
        &self,
        step: StepFn,
        state: *mut c_void,
        x0: &Value,
        objective: &mut O,
    ) -> Result<RcommOutcome, CallError> {
        let mut driver =
            ReverseCommunication::new(x0)?.with_max_requests(self.config.ffi.max_requests);
        with_call_span("rcomm", "step", || unsafe { driver.run(step, state, objective) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_paths_merge_without_duplicates() {
        let registry = Mutex::new(LibraryRegistry::new());
        registry.lock().unwrap().set_search_paths(vec![PathBuf::from("/opt/a")]);

        merge_search_paths(&registry, &[PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]).unwrap();
        assert_eq!(
            registry.lock().unwrap().search_paths(),
            &[PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]
        );
    }

    #[test]
    fn poisoned_registry_is_reported() {
        let registry = Mutex::new(LibraryRegistry::new());
        let _ = std::panic::catch_unwind(|| {
            let _guard = registry.lock().unwrap();
            panic!("poison the lock");
        });
        assert!(registry.is_poisoned());

        let err = merge_search_paths(&registry, &[PathBuf::from("/opt/a")]).unwrap_err();
        assert!(matches!(err, CallError::Library(ref m) if m.contains("poisoned")));
    }
}
