//! Option storage trait for redsess.

use std::sync::Arc;

use crate::error::Result;

/// Trait for persisted option stores.
///
/// Values are plain strings keyed by option name, mirroring the host's
/// get/set option API.
pub trait OptionStore: Send + Sync {
    /// Read an option.
    ///
    /// Returns `Ok(None)` if the option was never set.
    fn get_option(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite an option.
    fn set_option(&self, key: &str, value: &str) -> Result<()>;

    /// Remove an option.
    ///
    /// Returns `Ok(())` even if the option doesn't exist.
    fn delete_option(&self, key: &str) -> Result<()>;

    /// Read an option as a boolean flag.
    ///
    /// Missing or unrecognized values read as `false`.
    fn get_flag(&self, key: &str) -> Result<bool> {
        Ok(matches!(
            self.get_option(key)?.as_deref(),
            Some("1") | Some("true")
        ))
    }

    /// Persist a boolean flag.
    fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.set_option(key, if value { "1" } else { "0" })
    }
}

/// Blanket implementation of OptionStore for Arc-wrapped stores.
///
/// Lets tests keep a handle on the store they hand to the service.
impl<T: OptionStore + ?Sized> OptionStore for Arc<T> {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        (**self).get_option(key)
    }

    fn set_option(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_option(key, value)
    }

    fn delete_option(&self, key: &str) -> Result<()> {
        (**self).delete_option(key)
    }
}

impl OptionStore for Box<dyn OptionStore> {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        (**self).get_option(key)
    }

    fn set_option(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_option(key, value)
    }

    fn delete_option(&self, key: &str) -> Result<()> {
        (**self).delete_option(key)
    }
}
