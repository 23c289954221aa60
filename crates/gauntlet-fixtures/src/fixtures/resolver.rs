//! Fixture file lookup and `inherits` expansion.

use std::path::{Path, PathBuf};

use super::context::LoadContext;
use super::parser::FixtureParser;
use super::references::resolve_extension;
use crate::error::{FixtureError, FixtureResult, ResultExt};

/// Extensions tried after the bare name, in order.
const CANDIDATE_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Resolves fixture names to files and loads them into a [`LoadContext`].
#[derive(Debug)]
pub struct FixtureResolver<'a> {
	location: &'a Path,
	parser: FixtureParser,
	debug: bool,
}

impl<'a> FixtureResolver<'a> {
	/// Creates a resolver for fixtures under `location`.
	pub fn new(location: &'a Path) -> Self {
		Self {
			location,
			parser: FixtureParser::new(),
			debug: false,
		}
	}

	/// Logs file loads at info level when set.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// Finds the file for a fixture name.
	///
	/// Tries `location/name`, `location/name.yml` and `location/name.yaml`,
	/// first existing file wins.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::FileNotFound`] if none exists.
	pub fn locate(&self, name: &str) -> FixtureResult<PathBuf> {
		let bare = self.location.join(name);
		if bare.is_file() {
			return Ok(bare);
		}

		CANDIDATE_EXTENSIONS
			.iter()
			.map(|ext| self.location.join(format!("{}.{}", name, ext)))
			.find(|candidate| candidate.is_file())
			.ok_or_else(|| FixtureError::FileNotFound {
				name: name.to_string(),
				location: self.location.display().to_string(),
			})
	}

	/// Loads a fixture and everything it inherits into `ctx`.
	///
	/// Inherited fixtures are loaded first, so a document may `$extend`
	/// templates of the files it inherits. A file already loaded in this
	/// context is skipped; it is marked before its `inherits` are followed,
	/// which also stops inheritance cycles.
	///
	/// Templates are resolved and registered here. Tables are queued in
	/// encounter order for the loader.
	pub fn load(&self, name: &str, ctx: &mut LoadContext) -> FixtureResult<()> {
		self.load_file(name, ctx)
			.with_location(|| format!("fixture '{}'", name))
	}

	fn load_file(&self, name: &str, ctx: &mut LoadContext) -> FixtureResult<()> {
		let path = self.locate(name)?;
		let key = path.canonicalize().unwrap_or_else(|_| path.clone());
		if !ctx.mark_loaded(&key) {
			tracing::debug!(path = %path.display(), "Fixture file already loaded, skipping");
			return Ok(());
		}

		if self.debug {
			tracing::info!(path = %path.display(), "Loading fixture file");
		} else {
			tracing::debug!(path = %path.display(), "Loading fixture file");
		}

		let document = self.parser.parse_file(&path)?;

		for parent in &document.inherits {
			self.load(parent, ctx)?;
		}

		for (template, row) in &document.templates {
			resolve_extension(row, ctx)
				.and_then(|resolved| ctx.define(template, resolved))
				.with_location(|| format!("template '{}'", template))?;
			tracing::debug!(name = %template, "Populating ref from template");
		}

		for (table, rows) in document.tables {
			ctx.push_table(table, rows);
		}

		Ok(())
	}
}
