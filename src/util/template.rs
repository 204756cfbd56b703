//! Template expansion for user-supplied strings.
//!
//! Supports `{{ .Key }}` field substitution and `{{ .Env.NAME }}` environment
//! lookups. Fields come from the run context (`ProjectName`, `Dist`) and, once
//! bound, from the current target and build options (`Target`, `Name`,
//! `Path`, `Ext`, plus every key the target exposes through
//! [`Target::fields`]).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::builder::BuildOptions;
use crate::core::target::Target;
use crate::util::context::Context;

/// Template expansion failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed action in template `{template}`")]
    Unclosed { template: String },

    #[error("unsupported template action `{action}`")]
    Unsupported { action: String },

    #[error("unknown template key `{key}`")]
    UnknownKey { key: String },

    #[error("environment variable `{name}` is not set")]
    MissingEnv { name: String },

    #[error("template `{template}` expanded to `{value}`, which is not a boolean")]
    NotBool { template: String, value: String },
}

/// Filters applied by [`Template::slice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceFilter {
    /// Drop elements that expand to an empty string
    NonEmpty,
}

/// A template expander bound to a set of fields and an environment.
#[derive(Debug, Clone, Default)]
pub struct Template {
    fields: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
}

impl Template {
    /// Create an expander for the given run context.
    pub fn new(ctx: &Context) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("ProjectName".to_string(), ctx.project.project_name.clone());
        fields.insert("Dist".to_string(), ctx.project.dist.display().to_string());

        Template {
            fields,
            env: ctx.env.clone(),
        }
    }

    /// Add or override a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add `KEY=VALUE` entries to the environment, expanding each value first.
    ///
    /// Entries without `=` are ignored.
    pub fn with_env(mut self, entries: &[String]) -> Result<Self, TemplateError> {
        for entry in entries {
            let expanded = self.apply(entry)?;
            if let Some((key, value)) = expanded.split_once('=') {
                self.env.insert(key.to_string(), value.to_string());
            }
        }
        Ok(self)
    }

    /// Expose the target string and its fields.
    pub fn with_target(mut self, target: &dyn Target) -> Self {
        self.fields.insert("Target".to_string(), target.to_string());
        self.fields.extend(target.fields());
        self
    }

    /// Expose the resolved build options, including their target.
    pub fn with_build_options(self, options: &BuildOptions) -> Self {
        self.with_target(options.target.as_ref())
            .with_field("Name", options.name.clone())
            .with_field("Path", options.path.display().to_string())
            .with_field("Ext", options.ext.clone())
    }

    /// The environment seen by `{{ .Env.* }}`.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Expand every action in `text`.
    pub fn apply(&self, text: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| TemplateError::Unclosed {
                template: text.to_string(),
            })?;
            out.push_str(&self.eval(after[..end].trim())?);
            rest = &after[end + 2..];
        }
        out.push_str(rest);

        Ok(out)
    }

    fn eval(&self, action: &str) -> Result<String, TemplateError> {
        let Some(path) = action.strip_prefix('.') else {
            return Err(TemplateError::Unsupported {
                action: action.to_string(),
            });
        };

        if let Some(name) = path.strip_prefix("Env.") {
            return self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::MissingEnv {
                    name: name.to_string(),
                });
        }

        self.fields
            .get(path)
            .cloned()
            .ok_or_else(|| TemplateError::UnknownKey {
                key: path.to_string(),
            })
    }

    /// Expand `text` and interpret it as a boolean.
    ///
    /// An empty expansion is `false`.
    pub fn bool(&self, text: &str) -> Result<bool, TemplateError> {
        let value = self.apply(text)?;
        match value.trim() {
            "" | "false" => Ok(false),
            "true" => Ok(true),
            other => Err(TemplateError::NotBool {
                template: text.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Expand every element of `list`, then apply `filters`.
    pub fn slice(
        &self,
        list: &[String],
        filters: &[SliceFilter],
    ) -> Result<Vec<String>, TemplateError> {
        let mut out = Vec::with_capacity(list.len());
        for item in list {
            let value = self.apply(item)?;
            let keep = filters.iter().all(|filter| match filter {
                SliceFilter::NonEmpty => !value.is_empty(),
            });
            if keep {
                out.push(value);
            }
        }
        Ok(out)
    }
}

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("env placeholder pattern is valid")
});

/// Expand `$VAR` and `${VAR}` against `lookup`. Unset variables expand to
/// nothing.
pub fn expand_env<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}

/// Expand `$VAR` and `${VAR}` against the process environment.
pub fn expand_process_env(text: &str) -> String {
    expand_env(text, |name| std::env::var(name).ok())
}
