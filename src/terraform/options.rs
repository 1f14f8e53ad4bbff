use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::retry::RetryPolicy;

pub const DEFAULT_BINARY: &str = "terraform";

/// Value of a `-var` input variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for VarValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for VarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Everything needed to run the provisioning tool for one scenario.
///
/// Built once through the consuming builder methods and then only read.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub terraform_dir: PathBuf,
    pub terraform_binary: String,
    pub vars: BTreeMap<String, VarValue>,
    pub env_vars: BTreeMap<String, String>,
    pub no_color: bool,
    pub retry: Option<RetryPolicy>,
}

impl Options {
    pub fn new(terraform_dir: impl Into<PathBuf>) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
            terraform_binary: DEFAULT_BINARY.to_string(),
            vars: BTreeMap::new(),
            env_vars: BTreeMap::new(),
            no_color: false,
            retry: None,
        }
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.terraform_binary = binary.into();
        self
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<VarValue>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Retries the well-known transient tool failures with the default policy.
    pub fn with_default_retryable_errors(self) -> Self {
        self.retry_policy(RetryPolicy::default())
    }

    pub fn dir(&self) -> &Path {
        &self.terraform_dir
    }

    pub fn init_args(&self) -> Vec<String> {
        self.finish(vec!["init", "-upgrade=false", "-input=false"], false)
    }

    pub fn apply_args(&self) -> Vec<String> {
        self.finish(vec!["apply", "-input=false", "-auto-approve"], true)
    }

    pub fn destroy_args(&self) -> Vec<String> {
        self.finish(vec!["destroy", "-auto-approve", "-input=false"], true)
    }

    pub fn validate_args(&self) -> Vec<String> {
        self.finish(vec!["validate"], false)
    }

    pub fn fmt_check_args(&self) -> Vec<String> {
        self.finish(vec!["fmt", "-check"], false)
    }

    // NOTE: -json output is never colored, -no-color is passed regardless
    pub fn output_args(&self, name: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = ["output", "-no-color", "-json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(name) = name {
            args.push(name.to_string());
        }
        args
    }

    fn finish(&self, base: Vec<&str>, with_vars: bool) -> Vec<String> {
        let mut args: Vec<String> = base.into_iter().map(str::to_string).collect();
        if with_vars {
            for (name, value) in &self.vars {
                args.push("-var".to_string());
                args.push(format!("{name}={value}"));
            }
        }
        if self.no_color {
            args.push("-no-color".to_string());
        }
        args
    }
}
