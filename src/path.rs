//! Path template compilation.
//!
//! Every matched route segment carries a path *template* (`/users/:id`).
//! Refresh decisions compare the template filled with the current params
//! (the segment's *resolved path*) against the one recorded for the same
//! depth on the previous navigation, so compilation has to be exact and
//! stable.
//!
//! # Template syntax
//!
//! | Token        | Meaning |
//! |--------------|---------|
//! | `literal`    | static segment, copied verbatim |
//! | `:name`      | required parameter |
//! | `:name?`     | optional parameter, segment dropped when absent |
//! | `:name*`     | optional repeated parameter, value split on `/` |
//! | `:name+`     | required repeated parameter |
//! | `:name(re)`  | constrained parameter; the constraint is ignored here |
//!
//! Parameter values are percent-encoded like `encodeURIComponent`.
//!
//! ```
//! use shell_navigator::path::compile_path;
//! use shell_navigator::RouteParams;
//!
//! let params = RouteParams::new().with("id", "42");
//! assert_eq!(compile_path("/users/:id/:tab?", &params).unwrap(), "/users/42");
//! ```

use crate::error::NavigationError;
use crate::params::encode_uri_component;
use crate::RouteParams;
#[cfg(feature = "cache")]
use parking_lot::Mutex;
use std::sync::Arc;

/// One `/`-separated piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    /// Copied verbatim.
    Static(String),
    /// Filled from [`RouteParams`].
    Param {
        /// Parameter name without sigils.
        name: String,
        /// `?` or `*` modifier.
        optional: bool,
        /// `*` or `+` modifier.
        repeat: bool,
    },
}

/// A tokenized path template, ready to be filled repeatedly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    template: String,
    tokens: Vec<PathToken>,
    leading_slash: bool,
    trailing_slash: bool,
}

impl CompiledPath {
    /// Tokenize a template.
    pub fn parse(template: &str) -> Self {
        let leading_slash = template.starts_with('/');
        let trailing_slash = template.len() > 1 && template.ends_with('/');

        let tokens = template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(parse_segment)
            .collect();

        Self {
            template: template.to_string(),
            tokens,
            leading_slash,
            trailing_slash,
        }
    }

    /// The source template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parsed tokens in order.
    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    /// Fill the template with `params`.
    ///
    /// Fails with [`NavigationError::MissingParam`] when a required parameter
    /// has no value.
    pub fn fill(&self, params: &RouteParams) -> Result<String, NavigationError> {
        let mut out = String::new();

        for token in &self.tokens {
            match token {
                PathToken::Static(text) => {
                    out.push('/');
                    out.push_str(text);
                }
                PathToken::Param {
                    name,
                    optional,
                    repeat,
                } => match params.get(name).filter(|v| !v.is_empty()) {
                    Some(value) if *repeat => {
                        for part in value.split('/').filter(|p| !p.is_empty()) {
                            out.push('/');
                            out.push_str(&encode_uri_component(part));
                        }
                    }
                    Some(value) => {
                        out.push('/');
                        out.push_str(&encode_uri_component(value));
                    }
                    None if *optional => {}
                    None => {
                        return Err(NavigationError::MissingParam {
                            name: name.clone(),
                            template: self.template.clone(),
                        });
                    }
                },
            }
        }

        if self.trailing_slash {
            out.push('/');
        }
        if !self.leading_slash {
            if let Some(stripped) = out.strip_prefix('/') {
                return Ok(stripped.to_string());
            }
        } else if out.is_empty() {
            out.push('/');
        }
        Ok(out)
    }
}

fn parse_segment(segment: &str) -> PathToken {
    let Some(rest) = segment.strip_prefix(':') else {
        return PathToken::Static(segment.to_string());
    };

    // `:id(\\d+)?` -> name `id`, modifier `?`
    let (head, modifier) = match rest.chars().last() {
        Some(c @ ('?' | '*' | '+')) => (&rest[..rest.len() - 1], Some(c)),
        _ => (rest, None),
    };
    let name = head.find('(').map_or(head, |pos| &head[..pos]);

    PathToken::Param {
        name: name.to_string(),
        optional: matches!(modifier, Some('?' | '*')),
        repeat: matches!(modifier, Some('*' | '+')),
    }
}

/// Compile and fill a template in one step, without caching.
pub fn compile_path(template: &str, params: &RouteParams) -> Result<String, NavigationError> {
    CompiledPath::parse(template).fill(params)
}

/// Compiles templates on behalf of the shell, memoising the tokenization
/// when the `cache` feature is enabled.
#[derive(Debug, Default)]
pub struct PathCompiler {
    #[cfg(feature = "cache")]
    cache: Mutex<crate::cache::TemplateCache>,
}

impl PathCompiler {
    /// Create a compiler with the default cache capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize `template`, reusing a cached result when possible.
    pub fn compiled(&self, template: &str) -> Arc<CompiledPath> {
        #[cfg(feature = "cache")]
        {
            let mut cache = self.cache.lock();
            if let Some(hit) = cache.get(template) {
                return hit;
            }
            let compiled = Arc::new(CompiledPath::parse(template));
            cache.insert(template.to_string(), Arc::clone(&compiled));
            compiled
        }
        #[cfg(not(feature = "cache"))]
        {
            Arc::new(CompiledPath::parse(template))
        }
    }

    /// Resolve `template` against `params`.
    pub fn resolve(&self, template: &str, params: &RouteParams) -> Result<String, NavigationError> {
        self.compiled(template).fill(params)
    }

    /// Cache statistics.
    #[cfg(feature = "cache")]
    pub fn stats(&self) -> crate::cache::CacheStats {
        self.cache.lock().stats().clone()
    }
}
