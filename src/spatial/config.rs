use std::path::PathBuf;

/// Bit flags accepted by [`correct`](crate::spatial::correct).
pub mod flags {
    /// Log per-stage summaries
    pub const PARTIAL_VERBOSE: u32 = 0x1;
    /// Log per-stage summaries and extremes
    pub const VERY_VERBOSE: u32 = 0x2;
    /// Restrict correction to the active area described by a mask file
    pub const ACTIVE_ONLY: u32 = 0x8;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    #[default]
    Quiet,
    Partial,
    Very,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionConfig {
    pub verbosity: Verbosity,
    pub active_only: bool,
    pub mask_path: Option<PathBuf>,
    /// Fill pixels that received no contribution during resampling
    pub extrapolate: bool,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Quiet,
            active_only: false,
            mask_path: None,
            extrapolate: true,
        }
    }
}

impl CorrectionConfig {
    pub fn builder() -> CorrectionConfigBuilder {
        CorrectionConfigBuilder::default()
    }

    /// Maps the legacy flag word onto a configuration. Unknown bits are ignored.
    pub fn from_flags(bits: u32) -> Self {
        let verbosity = if bits & flags::VERY_VERBOSE != 0 {
            Verbosity::Very
        } else if bits & flags::PARTIAL_VERBOSE != 0 {
            Verbosity::Partial
        } else {
            Verbosity::Quiet
        };
        Self {
            verbosity,
            active_only: bits & flags::ACTIVE_ONLY != 0,
            ..Self::default()
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity > Verbosity::Quiet
    }

    /// Mask file to load, if active-area mode is on and one is configured.
    pub fn effective_mask_path(&self) -> Option<&PathBuf> {
        self.mask_path
            .as_ref()
            .filter(|p| self.active_only && !p.as_os_str().is_empty())
    }
}

#[derive(Default)]
pub struct CorrectionConfigBuilder {
    verbosity: Option<Verbosity>,
    active_only: Option<bool>,
    mask_path: Option<Option<PathBuf>>,
    extrapolate: Option<bool>,
}

impl CorrectionConfigBuilder {
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    pub fn active_only(mut self, active_only: bool) -> Self {
        self.active_only = Some(active_only);
        self
    }

    pub fn mask_path(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.mask_path = Some(path.map(Into::into));
        self
    }

    pub fn extrapolate(mut self, extrapolate: bool) -> Self {
        self.extrapolate = Some(extrapolate);
        self
    }

    pub fn build(self) -> CorrectionConfig {
        let default = CorrectionConfig::default();
        CorrectionConfig {
            verbosity: self.verbosity.unwrap_or(default.verbosity),
            active_only: self.active_only.unwrap_or(default.active_only),
            mask_path: self.mask_path.unwrap_or(default.mask_path),
            extrapolate: self.extrapolate.unwrap_or(default.extrapolate),
        }
    }
}
