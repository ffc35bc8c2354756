//! Dynamic library loader.
//!
//! Opens a native shared library with `RTLD_NOW | RTLD_GLOBAL` and resolves
//! function pointers by name. Resolution is eager: the tables in
//! [`crate::ffi`] look up every symbol when they are built, so a missing
//! native symbol fails the load instead of the first call.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_NOW};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a native library
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open native library {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("library {library:?} returned NULL function pointer for \"{symbol}\"")]
    MissingSymbol { library: PathBuf, symbol: &'static str },
}

/// A shared library kept open for as long as this value lives.
pub struct NativeLibrary {
    path: PathBuf,
    lib: Library,
}

impl NativeLibrary {
    /// Open `path`, appending the platform's shared-library suffix if absent.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = with_library_suffix(path.as_ref());
        // SAFETY: loading runs the library's initializers; the UG libraries
        // have no initializers with preconditions on the caller.
        let lib = unsafe { Library::open(Some(&path), RTLD_NOW | RTLD_GLOBAL) }.map_err(
            |source| LoadError::Open {
                path: path.clone(),
                source,
            },
        )?;
        debug!(library = ?path, "opened native library");
        Ok(Self { path, lib })
    }

    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `name` as a value of type `T` (normally an `extern "C" fn`).
    ///
    /// # Safety
    ///
    /// `T` must match the native symbol's real type. The returned value must
    /// not be used after this library is dropped.
    pub unsafe fn symbol<T: Copy>(&self, name: &'static str) -> Result<T, LoadError> {
        match self.lib.get::<T>(name.as_bytes()) {
            Ok(sym) => Ok(*sym),
            Err(_) => Err(LoadError::MissingSymbol {
                library: self.path.clone(),
                symbol: name,
            }),
        }
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .finish()
    }
}

/// Append `.so` (or the platform suffix) unless the name already carries it.
pub fn with_library_suffix(path: &Path) -> PathBuf {
    let suffix = std::env::consts::DLL_SUFFIX;
    if path.to_string_lossy().contains(suffix) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Declare a table of typed native functions resolved from one library.
///
/// ```ignore
/// native_table! {
///     /// libfoo
///     pub struct LibFoo {
///         fn foo_init(argc: c_int) -> c_int;
///     }
/// }
/// ```
///
/// Generates a struct with one `unsafe extern "C" fn` field per entry plus a
/// `load` constructor that resolves every name or fails with
/// [`LoadError::MissingSymbol`].
#[macro_export]
macro_rules! native_table {
    (
        $(#[$meta:meta])*
        pub struct $table:ident {
            $(
                $(#[$fmeta:meta])*
                fn $sym:ident ( $($arg:ident : $aty:ty),* $(,)? ) $(-> $ret:ty)? ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[allow(non_snake_case)]
        #[derive(Clone, Copy)]
        pub struct $table {
            $(
                $(#[$fmeta])*
                pub $sym: unsafe extern "C" fn($($arg: $aty),*) $(-> $ret)?,
            )*
        }

        impl $table {
            /// Every symbol name in declaration order.
            pub const SYMBOLS: &'static [&'static str] = &[$(stringify!($sym)),*];

            /// Resolve every symbol from `lib`.
            ///
            /// # Safety
            ///
            /// `lib` must export these symbols with the declared signatures,
            /// and must outlive the returned table.
            pub unsafe fn load(
                lib: &$crate::loader::NativeLibrary,
            ) -> ::std::result::Result<Self, $crate::loader::LoadError> {
                let table = Self {
                    $(
                        $sym: lib.symbol::<unsafe extern "C" fn($($aty),*) $(-> $ret)?>(
                            stringify!($sym),
                        )?,
                    )*
                };
                ::tracing::debug!(
                    library = ?lib.path(),
                    symbols = Self::SYMBOLS.len(),
                    "resolved native symbols"
                );
                Ok(table)
            }
        }

        impl ::std::fmt::Debug for $table {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($table))
                    .field("symbols", &Self::SYMBOLS.len())
                    .finish()
            }
        }
    };
}
