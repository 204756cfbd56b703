//! Target contract - what a build is for.
//!
//! Every builder encodes targets its own way (`linux_amd64_v1`,
//! `x86_64-unknown-linux-gnu`, `aarch64-macos`, ...). The orchestrator never
//! interprets that encoding; it only relies on the canonical text form and on
//! the fields exposed to templates.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// Template key for the operating system of a target.
pub const KEY_OS: &str = "Os";

/// Template key for the architecture of a target.
pub const KEY_ARCH: &str = "Arch";

/// A parsed, builder-defined build target.
///
/// `Display` must render exactly the string the target was parsed from, so
/// that the same text always round-trips to an equal value.
pub trait Target: fmt::Display + fmt::Debug + Send + Sync {
    /// Values exposed to template expansion (`Os`, `Arch`, builder keys).
    fn fields(&self) -> BTreeMap<String, String>;

    /// Access the concrete type, for builders that need their own encoding back.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pair {
        os: String,
        arch: String,
    }

    impl fmt::Display for Pair {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}_{}", self.os, self.arch)
        }
    }

    impl Target for Pair {
        fn fields(&self) -> BTreeMap<String, String> {
            BTreeMap::from([
                (KEY_OS.to_string(), self.os.clone()),
                (KEY_ARCH.to_string(), self.arch.clone()),
            ])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_target_downcast_and_fields() {
        let target: Box<dyn Target> = Box::new(Pair {
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        });

        assert_eq!(target.to_string(), "linux_amd64");
        assert_eq!(target.fields()["Os"], "linux");

        let pair = target.as_any().downcast_ref::<Pair>().unwrap();
        assert_eq!(pair.arch, "amd64");
    }
}
