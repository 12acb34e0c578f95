//! Configuration for the deobfuscation engine.
//!
//! This module provides configuration types for controlling the deobfuscation
//! pipeline, including pass selection, iteration limits, and evaluation budgets.

use bitflags::bitflags;

use crate::emulation::EvalLimits;

/// Module attributes the attribute pass removes unless configured otherwise.
pub const BOILERPLATE_ATTRIBUTES: [&str; 8] = [
    "VB_Base",
    "VB_Creatable",
    "VB_Customizable",
    "VB_Exposed",
    "VB_GlobalNameSpace",
    "VB_Name",
    "VB_PredeclaredId",
    "VB_TemplateDerived",
];

bitflags! {
    /// The passes of the pipeline.
    ///
    /// Passes always run in declaration order; clearing a flag skips that pass.
    ///
    /// # Common Combinations
    ///
    /// - [`COSMETIC`](Self::COSMETIC) - Passes that never change behaviour or structure
    /// - [`ALL`](Self::ALL) - The full pipeline
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Passes: u32 {
        /// Remove boilerplate module attributes.
        const ATTRIBUTES = 0x01;
        /// Fold pure arithmetic on literals.
        const ARITHMETIC = 0x02;
        /// Canonicalize whitespace and statement separators.
        const WHITESPACE = 0x04;
        /// Rename locals, arguments and globals to short fresh names.
        const IDENTIFIERS = 0x08;
        /// Remove effect-free statements and dead stores.
        const DEAD_CODE = 0x10;
        /// Evaluate side-effect-free procedures and fold their call sites.
        const RESOLVE = 0x20;
        /// Splice trivial zero-argument procedures into their callers.
        const INLINE = 0x40;
        /// Cosmetic passes only.
        const COSMETIC = Self::ATTRIBUTES.bits() | Self::ARITHMETIC.bits() | Self::WHITESPACE.bits();
        /// Every pass.
        const ALL = Self::COSMETIC.bits()
            | Self::IDENTIFIERS.bits()
            | Self::DEAD_CODE.bits()
            | Self::RESOLVE.bits()
            | Self::INLINE.bits();
    }
}

impl Default for Passes {
    fn default() -> Self {
        Passes::ALL
    }
}

/// Configuration for the deobfuscation engine.
///
/// # Example
///
/// ```rust
/// use macroscope::deobfuscation::{DeobfuscatorConfig, Passes};
///
/// let config = DeobfuscatorConfig::default()
///     .without(Passes::IDENTIFIERS)
///     .with_max_iterations(50);
/// assert!(!config.passes.contains(Passes::IDENTIFIERS));
/// ```
#[derive(Debug, Clone)]
pub struct DeobfuscatorConfig {
    /// Enabled passes (default: all).
    pub passes: Passes,

    /// Attribute names removed by the attribute pass.
    pub boilerplate_attributes: Vec<String>,

    /// Cap on every fixed-point loop (default: 1000).
    ///
    /// Reaching it is reported as a warning; the module is still rendered.
    pub max_iterations: usize,

    /// Budgets of the evaluator used by the resolution pass.
    pub limits: EvalLimits,
}

impl Default for DeobfuscatorConfig {
    fn default() -> Self {
        Self {
            passes: Passes::ALL,
            boilerplate_attributes: BOILERPLATE_ATTRIBUTES.iter().map(ToString::to_string).collect(),
            max_iterations: 1000,
            limits: EvalLimits::default(),
        }
    }
}

impl DeobfuscatorConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that only runs the cosmetic passes.
    ///
    /// The output keeps every statement and every name of the input.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            passes: Passes::COSMETIC,
            ..Self::default()
        }
    }

    /// Replaces the set of enabled passes.
    #[must_use]
    pub fn with_passes(mut self, passes: Passes) -> Self {
        self.passes = passes;
        self
    }

    /// Disables the given passes.
    #[must_use]
    pub fn without(mut self, passes: Passes) -> Self {
        self.passes.remove(passes);
        self
    }

    /// Sets the fixed-point iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Replaces the attribute names removed by the attribute pass.
    #[must_use]
    pub fn with_boilerplate_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.boilerplate_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the evaluator budgets.
    #[must_use]
    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// True if the attribute `name` is boilerplate.
    #[must_use]
    pub fn is_boilerplate(&self, name: &str) -> bool {
        self.boilerplate_attributes.iter().any(|a| a == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeobfuscatorConfig::default();
        assert_eq!(config.passes, Passes::ALL);
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.boilerplate_attributes.len(), 8);
        assert!(config.is_boilerplate("VB_Name"));
        assert!(!config.is_boilerplate("vb_name"));
    }

    #[test]
    fn test_minimal_config() {
        let config = DeobfuscatorConfig::minimal();
        assert!(config.passes.contains(Passes::WHITESPACE));
        assert!(!config.passes.intersects(Passes::DEAD_CODE | Passes::RESOLVE | Passes::INLINE));
    }

    #[test]
    fn test_builder_pattern() {
        let config = DeobfuscatorConfig::new()
            .without(Passes::INLINE | Passes::IDENTIFIERS)
            .with_max_iterations(0)
            .with_boilerplate_attributes(["VB_Name"])
            .with_limits(EvalLimits::new().with_max_steps(10));

        assert!(!config.passes.contains(Passes::INLINE));
        assert!(config.passes.contains(Passes::RESOLVE));
        assert_eq!(config.max_iterations, 1);
        assert!(!config.is_boilerplate("VB_Base"));
        assert_eq!(config.limits.max_steps, 10);
    }
}
