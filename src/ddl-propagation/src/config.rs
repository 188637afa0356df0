// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Settings of DDL propagation.
//!
//! Each setting is a typed [`Config`] constant declared in this module. A
//! process registers them into a [`ConfigSet`] with
//! [`all_propagation_configs`] and passes the set around; a test creates
//! its own. Values live in shared atomics, so a [`ConfigUpdates`] batch
//! applied to a set is visible to every later read from it.
//!
//! Two settings describe the host: [`ENABLE_ALTER_STATISTICS_TARGET`] and
//! [`DDL_LOCK_REVALIDATION_ATTEMPTS`] are read once, when a
//! [`crate::Propagator`] is built. [`ENABLE_DDL_PROPAGATION`] is the
//! default for new sessions.
//!
//! ```
//! # use mz_ddl_propagation::config::{all_propagation_configs, ConfigSet, ENABLE_DDL_PROPAGATION};
//! let configs = all_propagation_configs(ConfigSet::default());
//! assert!(ENABLE_DDL_PROPAGATION.get(&configs));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tracing::error;

/// Whether DDL against distributed tables is propagated to worker nodes.
///
/// This is the default for new sessions, which may override it.
pub const ENABLE_DDL_PROPAGATION: Config<bool> = Config::new(
    "enable_ddl_propagation",
    true,
    "Whether DDL against distributed tables is propagated to worker nodes.",
);

/// Whether the host engine supports `ALTER STATISTICS .. SET STATISTICS`.
pub const ENABLE_ALTER_STATISTICS_TARGET: Config<bool> = Config::new(
    "enable_alter_statistics_target",
    true,
    "Whether the host engine supports altering the target of a statistics object.",
);

/// How many times a name is re-resolved after locking its table before
/// giving up on a concurrently changing object.
pub const DDL_LOCK_REVALIDATION_ATTEMPTS: Config<u32> = Config::new(
    "ddl_lock_revalidation_attempts",
    8,
    "How many times to re-resolve an object name that changed while waiting for its table lock.",
);

/// Registers every propagation setting in `configs`.
pub fn all_propagation_configs(configs: ConfigSet) -> ConfigSet {
    configs
        .add(&ENABLE_DDL_PROPAGATION)
        .add(&ENABLE_ALTER_STATISTICS_TARGET)
        .add(&DDL_LOCK_REVALIDATION_ATTEMPTS)
}

/// A named propagation setting of type `T`.
#[derive(Clone, Debug)]
pub struct Config<T> {
    name: &'static str,
    default: T,
    desc: &'static str,
}

impl<T: ConfigType> Config<T> {
    pub const fn new(name: &'static str, default: T, desc: &'static str) -> Self {
        Config {
            name,
            default,
            desc,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn desc(&self) -> &'static str {
        self.desc
    }

    pub fn default(&self) -> &T {
        &self.default
    }

    /// Reads the current value of the setting from `set`.
    ///
    /// Panics if the setting is not registered in `set`.
    pub fn get(&self, set: &ConfigSet) -> T {
        set.configs
            .get(self.name)
            .and_then(T::load)
            .unwrap_or_else(|| panic!("{} is not registered as a {}", self.name, T::NAME))
    }
}

/// The types a [`Config`] can hold.
pub trait ConfigType: Copy + fmt::Debug {
    /// The name of the type in messages.
    const NAME: &'static str;

    /// Wraps `self` in a fresh shared value.
    fn share(self) -> ConfigVal;

    /// Reads the current value, if `val` holds this type.
    fn load(val: &ConfigVal) -> Option<Self>;
}

impl ConfigType for bool {
    const NAME: &'static str = "bool";

    fn share(self) -> ConfigVal {
        ConfigVal::Bool(Arc::new(AtomicBool::new(self)))
    }

    fn load(val: &ConfigVal) -> Option<bool> {
        match val {
            ConfigVal::Bool(b) => Some(b.load(Ordering::SeqCst)),
            _ => None,
        }
    }
}

impl ConfigType for u32 {
    const NAME: &'static str = "u32";

    fn share(self) -> ConfigVal {
        ConfigVal::U32(Arc::new(AtomicU32::new(self)))
    }

    fn load(val: &ConfigVal) -> Option<u32> {
        match val {
            ConfigVal::U32(n) => Some(n.load(Ordering::SeqCst)),
            _ => None,
        }
    }
}

/// A shared setting value of any [`ConfigType`].
#[derive(Clone, Debug)]
pub enum ConfigVal {
    Bool(Arc<AtomicBool>),
    U32(Arc<AtomicU32>),
}

impl ConfigVal {
    /// Copies the current value of `src` into `self`. Returns `false`, and
    /// leaves `self` alone, if the two hold different types.
    fn store_from(&self, src: &ConfigVal) -> bool {
        match (self, src) {
            (ConfigVal::Bool(dst), ConfigVal::Bool(src)) => {
                dst.store(src.load(Ordering::SeqCst), Ordering::SeqCst)
            }
            (ConfigVal::U32(dst), ConfigVal::U32(src)) => {
                dst.store(src.load(Ordering::SeqCst), Ordering::SeqCst)
            }
            _ => return false,
        }
        true
    }
}

impl fmt::Display for ConfigVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigVal::Bool(b) => write!(f, "{}", b.load(Ordering::SeqCst)),
            ConfigVal::U32(n) => write!(f, "{}", n.load(Ordering::SeqCst)),
        }
    }
}

/// The current values of a group of settings.
///
/// Clones share their values. Sets created separately do not.
#[derive(Clone, Default)]
pub struct ConfigSet {
    configs: BTreeMap<&'static str, ConfigVal>,
}

impl ConfigSet {
    /// Registers `config` with its default value.
    ///
    /// Panics if a setting of the same name is already registered.
    pub fn add<T: ConfigType>(mut self, config: &Config<T>) -> Self {
        if self
            .configs
            .insert(config.name, config.default.share())
            .is_some()
        {
            panic!("{} registered twice", config.name);
        }
        self
    }

    /// The registered settings and their current values, by name.
    pub fn values(&self) -> impl Iterator<Item = (&'static str, &ConfigVal)> {
        self.configs.iter().map(|(name, val)| (*name, val))
    }
}

impl fmt::Debug for ConfigSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values().map(|(name, val)| (name, val.to_string())))
            .finish()
    }
}

/// New values for settings, applied together.
#[derive(Clone, Debug, Default)]
pub struct ConfigUpdates {
    updates: Vec<(String, ConfigVal)>,
}

impl ConfigUpdates {
    pub fn add<T: ConfigType>(&mut self, config: &Config<T>, val: T) {
        self.updates.push((config.name.to_owned(), val.share()));
    }

    /// Adds a value for the setting called `name`, for callers that only
    /// know settings by name, e.g. when reading them from a file.
    pub fn add_dynamic(&mut self, name: &str, val: ConfigVal) {
        self.updates.push((name.to_owned(), val));
    }

    /// Writes the values into `set`. An update for a setting `set` does not
    /// have, or of the wrong type, is logged and skipped.
    pub fn apply(&self, set: &ConfigSet) {
        for (name, val) in &self.updates {
            match set.configs.get(name.as_str()) {
                Some(current) => {
                    if !current.store_from(val) {
                        error!(%name, ?val, ?current, "config update has the wrong type");
                    }
                }
                None => error!(%name, ?val, ?set, "config update for unknown config"),
            }
        }
    }
}
