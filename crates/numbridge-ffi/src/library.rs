//! Native library loading and entry-point lookup.

use libloading::{Library, Symbol};
use std::ffi::CString;
use std::path::{Path, PathBuf};

use crate::abi::EntryPoint;
use crate::error::{CallError, Result};

/// A loaded native library.
pub struct NativeLibrary {
    library: Library,
    /// Path the library was loaded from (for diagnostics)
    path: String,
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary").field("path", &self.path).finish()
    }
}

impl NativeLibrary {
    /// Load a native library from a path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let library = unsafe { Library::new(path) }.map_err(|e| {
            CallError::Library(format!("Failed to load library '{}': {}", path.display(), e))
        })?;

        log::debug!("loaded native library {}", path.display());
        Ok(Self {
            library,
            path: path.display().to_string(),
        })
    }

    /// Load a library by base name (`"solver"` -> `libsolver.so`), trying each
    /// directory in `search_paths` before the system loader paths.
    pub fn load_by_name(name: &str, search_paths: &[PathBuf]) -> Result<Self> {
        let lib_name = Self::platform_lib_name(name);

        for dir in search_paths {
            let candidate = dir.join(&lib_name);
            if candidate.exists() {
                return Self::load(candidate);
            }
        }

        log::debug!("'{lib_name}' not in search paths, trying system loader");
        Self::load(&lib_name).map_err(|e| {
            CallError::Library(format!(
                "Failed to load library '{}' (searched {} path(s)): {}",
                name,
                search_paths.len(),
                e
            ))
        })
    }

    /// Platform-specific library filename.
    pub fn platform_lib_name(name: &str) -> String {
        #[cfg(target_os = "windows")]
        {
            format!("{}.dll", name)
        }
        #[cfg(target_os = "macos")]
        {
            format!("lib{}.dylib", name)
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            format!("lib{}.so", name)
        }
    }

    /// Get a symbol from the library.
    ///
    /// # Safety
    ///
    /// The type `F` must match the actual type of the exported symbol.
    pub unsafe fn get_function<F>(&self, name: &str) -> Result<Symbol<'_, F>> {
        let c_name = CString::new(name)
            .map_err(|_| CallError::Library(format!("Invalid function name: {}", name)))?;

        self.library.get(c_name.as_bytes_with_nul()).map_err(|e| {
            CallError::Library(format!("Function '{}' not found in '{}': {}", name, self.path, e))
        })
    }

    /// Resolve an exported function following the slot calling convention.
    ///
    /// # Safety
    ///
    /// The symbol must have the [`EntryPoint`] signature. The returned pointer
    /// must not outlive this library.
    pub unsafe fn entry_point(&self, name: &str) -> Result<EntryPoint> {
        let symbol = self.get_function::<EntryPoint>(name)?;
        Ok(*symbol)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_lib_name() {
        let name = NativeLibrary::platform_lib_name("test");
        #[cfg(target_os = "windows")]
        assert_eq!(name, "test.dll");
        #[cfg(target_os = "macos")]
        assert_eq!(name, "libtest.dylib");
        #[cfg(target_os = "linux")]
        assert_eq!(name, "libtest.so");
    }

    #[test]
    fn missing_library_is_a_library_error() {
        let err = NativeLibrary::load_by_name("numbridge_surely_missing", &[]).unwrap_err();
        assert!(matches!(err, CallError::Library(_)));
        assert!(err.to_string().contains("numbridge_surely_missing"));
    }
}
