//! Platform detection and native library naming.

use std::fmt;

/// Supported platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Unknown,
}

impl Platform {
    /// Detect the platform from an OS identity string.
    ///
    /// Matching is a case-insensitive substring test against OS family names,
    /// so new variants ("Windows 11", "Linux 6.x") keep working. `mac` and
    /// `darwin` are tested before `win` because "darwin" contains "win".
    pub fn detect(os: &str) -> Self {
        let os = os.to_lowercase();
        if os.contains("mac") || os.contains("darwin") {
            Platform::MacOs
        } else if os.contains("win") {
            Platform::Windows
        } else if os.contains("linux") {
            Platform::Linux
        } else {
            Platform::Unknown
        }
    }

    /// Detect the platform of the running process.
    pub fn current() -> Self {
        Self::detect(std::env::consts::OS)
    }

    /// Native library file suffix, `None` for [`Platform::Unknown`].
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Platform::Linux => Some("so"),
            Platform::MacOs => Some("jnilib"),
            Platform::Windows => Some("dll"),
            Platform::Unknown => None,
        }
    }

    /// File name of a logical library on this platform (`lib<name>.<suffix>`).
    pub fn library_file_name(self, name: &str) -> Option<String> {
        self.suffix().map(|suffix| format!("lib{}.{}", name, suffix))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_os_names() {
        assert_eq!(Platform::detect("Windows 10"), Platform::Windows);
        assert_eq!(Platform::detect("Linux"), Platform::Linux);
        assert_eq!(Platform::detect("Mac OS X"), Platform::MacOs);
        assert_eq!(Platform::detect("macos"), Platform::MacOs);
        assert_eq!(Platform::detect("Darwin"), Platform::MacOs);
        assert_eq!(Platform::detect("WINDOWS SERVER 2022"), Platform::Windows);
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(Platform::detect("FreeBSD"), Platform::Unknown);
        assert_eq!(Platform::detect(""), Platform::Unknown);
        assert_eq!(Platform::Unknown.suffix(), None);
        assert_eq!(Platform::Unknown.library_file_name("spirvcrossj"), None);
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(Platform::detect("Windows 10").suffix(), Some("dll"));
        assert_eq!(Platform::detect("Linux").suffix(), Some("so"));
        assert_eq!(Platform::detect("Mac OS X").suffix(), Some("jnilib"));
    }

    #[test]
    fn test_library_file_name() {
        assert_eq!(
            Platform::Linux.library_file_name("spirvcrossj").as_deref(),
            Some("libspirvcrossj.so")
        );
        assert_eq!(
            Platform::Windows.library_file_name("SPIRV-Tools-shared").as_deref(),
            Some("libSPIRV-Tools-shared.dll")
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_linux() {
        assert_eq!(Platform::current(), Platform::Linux);
    }
}
