//! Command path parsing and scope traversal.
//!
//! A path is a sequence of segments separated by `.`:
//! - `ship Aurora.speed 12` → `["ship Aurora", "speed 12"]`
//! - a `.` followed by an escape character is kept: with digits escaped,
//!   `speed.5` is a single segment
//! - a trailing `.` is dropped
//!
//! Each segment is a command name followed by space separated tokens.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use super::catalog::Command;
use super::definitions::Context;
use super::executor::InvocationError;
use crate::value::Value;

/// Characters that stop a `.` from acting as a segment boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeSet {
    chars: BTreeSet<char>,
}

impl EscapeSet {
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        Self {
            chars: chars.into_iter().collect(),
        }
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }
}

impl Default for EscapeSet {
    /// The ASCII digits, so decimal values survive inside a path.
    fn default() -> Self {
        Self::from_chars('0'..='9')
    }
}

/// Splits a path into its segments.
pub fn split_path(path: &str, escape: &EscapeSet) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '.' {
            current.push(c);
            continue;
        }
        match chars.peek() {
            Some(&next) if escape.contains(next) => current.push(c),
            Some(_) => segments.push(std::mem::take(&mut current)),
            // Trailing period
            None => {}
        }
    }

    segments.push(current);
    segments
}

/// Splits a segment into its command name and tokens.
///
/// Repeated spaces never produce empty tokens.
pub fn split_segment(segment: &str) -> (&str, Vec<&str>) {
    let mut parts = segment.split(' ').filter(|part| !part.is_empty());
    let name = parts.next().unwrap_or("");
    (name, parts.collect())
}

/// Name of the final segment of a path, used when reporting an unknown command.
pub fn last_segment_name(path: &str, escape: &EscapeSet) -> String {
    split_path(path, escape)
        .last()
        .map(|segment| split_segment(segment).0.to_string())
        .unwrap_or_default()
}

/// A command located by a path but not yet executed.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub command: Arc<Command>,
    pub tokens: Vec<String>,
    /// Scope instance the command runs against.
    pub scope: Value,
}

/// Walks a path from the root scope through every sub-scope it names.
pub struct PathResolver<'a> {
    ctx: Context<'a>,
}

impl<'a> PathResolver<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    /// Resolves the command named by the final segment of `path`.
    ///
    /// Returns `Ok(None)` if any segment does not name a command in its scope
    /// or any intermediate command yields no sub-scope. Only unhandled
    /// failures of intermediate commands are returned as errors.
    pub fn resolve(&self, path: &str) -> Result<Option<Resolved>, InvocationError> {
        let segments = split_path(path, self.ctx.registry.escape_set());
        let Some((last, parents)) = segments.split_last() else {
            return Ok(None);
        };

        let Some(scope) = self.walk(parents)? else {
            return Ok(None);
        };

        let (name, tokens) = split_segment(last);
        Ok(self
            .ctx
            .registry
            .lookup(scope.value_type(), name)
            .map(|command| Resolved {
                command,
                tokens: tokens.into_iter().map(str::to_string).collect(),
                scope,
            }))
    }

    /// Resolves `path` to a scope instance, treating every segment
    /// (including the last) as a scope hop. An empty path is the root.
    pub fn resolve_scope(&self, path: &str) -> Result<Option<Value>, InvocationError> {
        let path = path.trim();
        if path.is_empty() {
            return Ok(Some(self.ctx.registry.root().clone()));
        }
        let segments = split_path(path, self.ctx.registry.escape_set());
        self.walk(&segments)
    }

    fn walk(&self, segments: &[String]) -> Result<Option<Value>, InvocationError> {
        let mut scope = self.ctx.registry.root().clone();
        for segment in segments {
            match self.hop(segment, &scope)? {
                Some(next) => scope = next,
                None => return Ok(None),
            }
        }
        Ok(Some(scope))
    }

    fn hop(&self, segment: &str, scope: &Value) -> Result<Option<Value>, InvocationError> {
        let (name, tokens) = split_segment(segment);
        let Some(command) = self.ctx.registry.lookup(scope.value_type(), name) else {
            return Ok(None);
        };

        let tokens: Vec<String> = tokens.into_iter().map(str::to_string).collect();
        match command.get_subscope(&tokens, scope, self.ctx) {
            Ok(next) => Ok(next),
            Err(err @ InvocationError::Unhandled { .. }) => Err(err),
            Err(err) => {
                warn!("Scope traversal through '{name}' failed: {err}");
                self.ctx.log.error(err.to_string());
                Ok(None)
            }
        }
    }
}
