//! Filter plugin system.
//!
//! A process-wide registry maps filter names to plugins. Compile-time
//! builtins cover the stock effects; callers can register their own plugins
//! at init (registration is idempotent by name, last registration wins).
//! The registry is read-mostly: lookups take a read lock only.

pub mod builtin;

mod color;
mod convolve;
mod effects;

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{EngineError, ErrorCode};
use crate::raster::Raster;

/// One parameter value in a neutral key/value record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Bool(bool),
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Number(f64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Number(f64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

/// Named parameters for one filter application.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterParams(BTreeMap<String, ParamValue>);

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.to_owned(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.0.get(key).copied()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(ParamValue::Number(v)) => Some(v),
            _ => None,
        }
    }

    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    /// Fill in any keys missing here from `defaults`.
    pub fn merged_over(mut self, defaults: &FilterParams) -> Self {
        for (key, value) in &defaults.0 {
            self.0.entry(key.clone()).or_insert(*value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of parameter validation. Validation is pure and cheap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: vec![message.into()],
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }
}

/// Validate that `key` holds a number within `[lo, hi]`, treating a missing
/// key as valid (defaults fill it in).
pub(crate) fn check_range(params: &FilterParams, key: &str, lo: f64, hi: f64) -> Validation {
    match params.get(key) {
        None => Validation::ok(),
        Some(ParamValue::Number(v)) if v.is_finite() && (lo..=hi).contains(&v) => Validation::ok(),
        Some(ParamValue::Number(v)) => {
            Validation::fail(format!("{key} must be in [{lo}, {hi}], got {v}"))
        }
        Some(ParamValue::Bool(_)) => Validation::fail(format!("{key} must be a number")),
    }
}

/// A named pixel effect.
///
/// `validate` is called with defaults merged in before every `apply`.
/// `apply` takes the raster by value and may mutate it in place or return a
/// replacement.
pub trait FilterPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn default_params(&self) -> FilterParams {
        FilterParams::new()
    }

    fn validate(&self, params: &FilterParams) -> Validation;

    fn apply(&self, raster: Raster, params: &FilterParams) -> Result<Raster, EngineError>;

    /// Cheap preview rendering. Plugins with an approximation can override
    /// this; the default is the full effect.
    fn preview(&self, raster: Raster, params: &FilterParams) -> Result<Raster, EngineError> {
        self.apply(raster, params)
    }
}

/// One recorded filter application.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterOp {
    pub name: String,
    pub params: FilterParams,
}

impl FilterOp {
    pub fn new(name: &str, params: FilterParams) -> Self {
        Self {
            name: name.to_owned(),
            params,
        }
    }
}

type Registry = RwLock<BTreeMap<String, Arc<dyn FilterPlugin>>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| RwLock::new(builtin::all()))
}

/// Register a plugin. Idempotent by name; the last registration wins.
pub fn register(plugin: Arc<dyn FilterPlugin>) -> Result<(), EngineError> {
    let name = plugin.name().to_owned();
    if name.is_empty() {
        return Err(EngineError::new(
            ErrorCode::FeatureNotSupported,
            "filter plugin name must not be empty",
        ));
    }
    let defaults = plugin.default_params();
    let validation = plugin.validate(&defaults);
    if !validation.valid {
        return Err(EngineError::new(
            ErrorCode::FeatureNotSupported,
            format!(
                "filter plugin {name:?} rejects its own defaults: {}",
                validation.errors.join("; ")
            ),
        ));
    }
    let mut map = registry().write().expect("filter registry poisoned");
    map.insert(name, plugin);
    Ok(())
}

/// Names of every registered filter.
pub fn available_filters() -> Vec<String> {
    registry()
        .read()
        .expect("filter registry poisoned")
        .keys()
        .cloned()
        .collect()
}

fn lookup(name: &str) -> Result<Arc<dyn FilterPlugin>, EngineError> {
    registry()
        .read()
        .expect("filter registry poisoned")
        .get(name)
        .cloned()
        .ok_or_else(|| {
            EngineError::new(
                ErrorCode::FeatureNotSupported,
                format!("unknown filter {name:?}"),
            )
        })
}

/// Validate and apply one filter.
pub fn apply_filter(
    raster: Raster,
    name: &str,
    params: &FilterParams,
) -> Result<Raster, EngineError> {
    let plugin = lookup(name)?;
    let params = params.clone().merged_over(&plugin.default_params());
    let validation = plugin.validate(&params);
    for warning in &validation.warnings {
        log::warn!("filter {name}: {warning}");
    }
    if !validation.valid {
        return Err(EngineError::new(
            ErrorCode::ProcessingFailed,
            format!(
                "invalid parameters for filter {name:?}: {}",
                validation.errors.join("; ")
            ),
        ));
    }
    plugin.apply(raster, &params)
}

/// Apply a chain of filters in order.
///
/// An empty chain is the identity. On failure the chain aborts and the error
/// context carries the failing index.
pub fn apply_chain(mut raster: Raster, ops: &[FilterOp]) -> Result<Raster, EngineError> {
    for (index, op) in ops.iter().enumerate() {
        raster = apply_filter(raster, &op.name, &op.params).map_err(|e| {
            let mut context = e.context().clone();
            context.index = Some(index);
            e.with_context(context)
        })?;
    }
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    struct Doubler;

    impl FilterPlugin for Doubler {
        fn name(&self) -> &str {
            "testDoubler"
        }

        fn validate(&self, _params: &FilterParams) -> Validation {
            Validation::ok()
        }

        fn apply(&self, mut raster: Raster, _params: &FilterParams) -> Result<Raster, EngineError> {
            for b in raster.as_bytes_mut() {
                *b = b.saturating_mul(2);
            }
            Ok(raster)
        }
    }

    struct BadPlugin;

    impl FilterPlugin for BadPlugin {
        fn name(&self) -> &str {
            ""
        }

        fn validate(&self, _params: &FilterParams) -> Validation {
            Validation::ok()
        }

        fn apply(&self, raster: Raster, _params: &FilterParams) -> Result<Raster, EngineError> {
            Ok(raster)
        }
    }

    fn gray(v: u8) -> Raster {
        Raster::filled(
            4,
            4,
            RGBA8 {
                r: v,
                g: v,
                b: v,
                a: 255,
            },
        )
        .unwrap()
    }

    #[test]
    fn builtins_are_discoverable() {
        let names = available_filters();
        for expected in [
            "brightness",
            "contrast",
            "saturation",
            "grayscale",
            "sepia",
            "invert",
            "noise",
            "vignette",
            "pixelate",
            "posterize",
            "blur",
            "sharpen",
            "emboss",
            "edgeDetection",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn register_and_apply_custom_plugin() {
        register(Arc::new(Doubler)).unwrap();
        let out = apply_filter(gray(30), "testDoubler", &FilterParams::new()).unwrap();
        assert_eq!(out.pixel(0, 0)[0], 60);
    }

    #[test]
    fn invalid_plugin_rejected() {
        let err = register(Arc::new(BadPlugin)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FeatureNotSupported);
    }

    #[test]
    fn unknown_filter_errors() {
        let err = apply_filter(gray(0), "noSuchFilter", &FilterParams::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FeatureNotSupported);
    }

    #[test]
    fn preview_defaults_to_full_apply() {
        let plugin = lookup("invert").unwrap();
        let out = plugin.preview(gray(10), &FilterParams::new()).unwrap();
        assert_eq!(out.pixel(0, 0)[0], 245);
    }

    #[test]
    fn empty_chain_is_identity() {
        let input = gray(123);
        let bytes = input.as_bytes().to_vec();
        let out = apply_chain(input, &[]).unwrap();
        assert_eq!(out.as_bytes(), &bytes[..]);
    }

    #[test]
    fn chain_failure_reports_index() {
        let ops = vec![
            FilterOp::new("invert", FilterParams::new()),
            FilterOp::new("brightness", FilterParams::new().set("value", 5000.0)),
        ];
        let err = apply_chain(gray(10), &ops).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProcessingFailed);
        assert_eq!(err.context().index, Some(1));
    }

    #[test]
    fn invalid_params_rejected_before_apply() {
        let err = apply_filter(
            gray(10),
            "brightness",
            &FilterParams::new().set("value", 101.0),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProcessingFailed);
    }
}
