//! `$extend` resolution and `$` expression parsing.
//!
//! Both are independent of the SQL dialect. Rendering the parsed expression
//! into SQL is left to [`Dialect`](crate::dialect::Dialect).

use super::context::LoadContext;
use super::document::Row;
use crate::error::{FixtureError, FixtureResult};

const EVAL_PREFIX: &str = "$eval(";

/// Applies `$extend` to a row or template.
///
/// The target must already be defined. Its fields are copied without
/// meta-keys and the row's own fields are laid on top. A row without
/// `$extend` is returned as is.
///
/// Each definition is stored fully resolved, so chains resolve one link at
/// a time without recursion.
pub fn resolve_extension(row: &Row, ctx: &LoadContext) -> FixtureResult<Row> {
	let Some(target) = row.extends() else {
		return Ok(row.clone());
	};

	let base = ctx.definition(target).ok_or_else(|| {
		FixtureError::UndefinedReference(format!("$extend target '{}' is not defined", target))
	})?;

	Ok(row.overlay_on(base))
}

/// Applies `$extend` and registers the result under its `$name`, if any.
///
/// Returns the effective row.
pub fn resolve_and_define(row: &Row, ctx: &mut LoadContext) -> FixtureResult<Row> {
	let resolved = resolve_extension(row, ctx)?;
	if let Some(name) = resolved.name() {
		ctx.define(name, resolved.clone())?;
		tracing::debug!(name = %name, "Populating ref from definition");
	}
	Ok(resolved)
}

/// A string value starting with `$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression<'a> {
	/// `$eval(expr)`: raw SQL emitted as `(expr)`.
	Eval(&'a str),

	/// `$name.field`: a field of an inserted row.
	Reference {
		/// Row name without the `$`.
		name: &'a str,
		/// Field name, everything after the first `.`.
		field: &'a str,
	},
}

impl<'a> Expression<'a> {
	/// Parses an expression string.
	///
	/// Only the final `)` closes an eval. The SQL inside is passed through
	/// without checking that its parentheses balance.
	///
	/// # Example
	///
	/// ```
	/// # use gauntlet_fixtures::fixtures::Expression;
	/// assert_eq!(
	///     Expression::parse("$eval(NOW() - interval '1 day')").unwrap(),
	///     Expression::Eval("NOW() - interval '1 day'"),
	/// );
	/// assert_eq!(
	///     Expression::parse("$user.profile.id").unwrap(),
	///     Expression::Reference { name: "user", field: "profile.id" },
	/// );
	/// ```
	///
	/// # Errors
	///
	/// Returns [`FixtureError::InvalidEvalExpression`] for a `$eval(` prefix
	/// that does not end in `)` or has nothing inside, and
	/// [`FixtureError::InvalidReference`] for anything else that is not
	/// `$name.field`.
	pub fn parse(source: &'a str) -> FixtureResult<Self> {
		if let Some(rest) = source.strip_prefix(EVAL_PREFIX) {
			return match rest.strip_suffix(')') {
				Some(inner) if !inner.is_empty() => Ok(Self::Eval(inner)),
				_ => Err(FixtureError::InvalidEvalExpression(source.to_string())),
			};
		}

		let body = source
			.strip_prefix('$')
			.ok_or_else(|| FixtureError::InvalidReference(source.to_string()))?;
		match body.split_once('.') {
			Some((name, field)) if !name.is_empty() && !field.is_empty() => {
				Ok(Self::Reference { name, field })
			}
			_ => Err(FixtureError::InvalidReference(source.to_string())),
		}
	}
}
