//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use serde::{Deserialize, Deserializer};

/// Configuration of the wiring processor.
///
/// # Examples
///
/// ```rust
/// use rpcwire::config::ProcessorConfig;
///
/// // Wire every component
/// let config = ProcessorConfig::default();
/// assert!(config.matches("com.other.Svc"));
///
/// // Wire only components below the given prefixes
/// let config = ProcessorConfig::new().with_packages("com.app.biz, com.app.api");
/// assert!(config.matches("com.app.biz.Greeter"));
/// assert!(!config.matches("com.other.Svc"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProcessorConfig {
    /// Class name prefixes of the components to wire.
    ///
    /// May be given as a list or as a comma-separated string. Empty wires
    /// every component and disables package scanning.
    ///
    /// Default: empty
    #[serde(default, deserialize_with = "deserialize_packages")]
    pub packages: Vec<String>,
}

impl ProcessorConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the packages from a comma-separated list.
    ///
    /// Blank entries are dropped.
    #[must_use]
    pub fn with_packages(mut self, packages: &str) -> Self {
        self.packages = split_packages(packages);
        self
    }

    /// Returns the configured prefixes.
    pub fn package_prefixes(&self) -> &[String] {
        &self.packages
    }

    /// Returns `true` if a component of `class_name` should be wired.
    pub fn matches(&self, class_name: &str) -> bool {
        self.packages.is_empty()
            || self
                .packages
                .iter()
                .any(|prefix| class_name.starts_with(prefix.as_str()))
    }
}

fn split_packages(packages: &str) -> Vec<String> {
    packages
        .split(',')
        .map(str::trim)
        .filter(|package| !package.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_packages<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Packages {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Packages::deserialize(deserializer)? {
        Packages::List(list) => list
            .iter()
            .flat_map(|entry| split_packages(entry))
            .collect(),
        Packages::Joined(joined) => split_packages(&joined),
    })
}
