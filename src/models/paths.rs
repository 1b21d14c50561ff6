use camino::{Utf8Path, Utf8PathBuf};

macro_rules! define_paths {
    ($name:ident { $($field:ident : $default:expr),* $(,)? }) => {
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: Utf8PathBuf,)*
        }

        impl $name {
            pub fn to_absolute(mut self, base: &Utf8Path) -> Self {
                $(self.$field = base.join(self.$field);)*
                self
            }

            pub fn new(base: &Utf8Path) -> Self {
                Self::default().to_absolute(base)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default.into(),)*
                }
            }
        }
    };
}

/// Metadata document expected at the root of a folder or archive package.
pub const METADATA_FILE: &str = "modinfo.json";

pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];
pub const ASSEMBLY_EXTENSIONS: &[&str] = &["dll"];

define_paths!(PackagesRootPaths {
    inactive: "_inactive",
});

define_paths!(DataPaths {
    activation: "activation.toml",
    logs: "logs",
});

impl PackagesRootPaths {
    /// Location an artifact occupies when enabled (`true`) or disabled.
    pub fn placement_for(&self, root: &Utf8Path, file_name: &str, enabled: bool) -> Utf8PathBuf {
        if enabled {
            root.join(file_name)
        } else {
            self.inactive.join(file_name)
        }
    }
}

pub fn has_extension(path: &Utf8Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
