//! Lowering: AST nodes into SQL fragments with tracked semantic types.
//!
//! Each compile constructs a fresh [`ParserState`], mutates it while
//! walking the query, and drops it on return - no cross-query state
//! escapes besides the read-only `Config`.
//!
//! Every lowered fragment registers its semantic type in an append-only
//! expression-to-type map; a collision between disagreeing types is a
//! compiler bug and surfaces as [`Error::Internal`].

pub mod condition;
pub mod expr;
pub mod fields;
pub mod functions;

pub use condition::{lower_condition, Lowered};
pub use expr::lower_expression;
pub use fields::resolve_field;

use std::collections::{HashMap, HashSet};

use crate::ast::Primitive;
use crate::config::{Config, SemanticType};
use crate::dialect::{Dialect, SqlDialect};
use crate::error::{Error, Result};

// =============================================================================
// Typed fragments
// =============================================================================

/// A lowered SQL fragment together with its inferred semantic type.
///
/// Carrying the type with the string keeps callers from dropping it; the
/// comparison emitter consults both sides to insert casts.
#[derive(Debug, Clone, PartialEq)]
pub struct Typed {
    pub sql: String,
    pub ty: SemanticType,
    /// Set when the fragment is a JSON leaf access; leaf comparisons cast
    /// the leaf side using the other side's type.
    pub json_leaf: bool,
}

impl Typed {
    pub fn new(sql: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            sql: sql.into(),
            ty,
            json_leaf: false,
        }
    }

    pub fn json_leaf(sql: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            sql: sql.into(),
            ty,
            json_leaf: true,
        }
    }
}

// =============================================================================
// Parameter emission
// =============================================================================

/// How scalar values reach the emitted SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamMode {
    /// Literals are embedded in the statement; `params` stays empty.
    #[default]
    Inline,
    /// Literals become dialect-native placeholders (`$1` / `?`), collected
    /// in order of first emission.
    Placeholders,
}

// =============================================================================
// Parser state
// =============================================================================

/// Mutable state for one compile: the processed-join set, the
/// expression-to-type map, and collected parameters.
#[derive(Debug)]
pub struct ParserState<'a> {
    pub config: &'a Config,
    /// The FROM table (effective name).
    pub root_table: String,
    pub dialect: Dialect,
    pub param_mode: ParamMode,
    /// JOIN clauses in emission order, de-duplicated by textual form.
    pub joins: Vec<String>,
    join_clauses: HashSet<String>,
    /// Effective table names already placed in the statement, root first.
    /// Its size drives numeric aliasing for repeat joins.
    processed_tables: Vec<String>,
    /// Effective name -> config table, for aliased joins.
    alias_sources: HashMap<String, String>,
    /// Tables of enclosing queries, visible inside `$exists` subqueries:
    /// `(effective name, config table)`.
    outer_tables: Vec<(String, String)>,
    /// Append-only fragment -> semantic type map.
    pub expressions: HashMap<String, SemanticType>,
    pub params: Vec<Primitive>,
}

impl<'a> ParserState<'a> {
    pub fn new(config: &'a Config, root_table: &str) -> Result<Self> {
        Self::with_param_mode(config, root_table, ParamMode::Inline)
    }

    pub fn with_param_mode(
        config: &'a Config,
        root_table: &str,
        param_mode: ParamMode,
    ) -> Result<Self> {
        config.table(root_table)?;
        Ok(Self {
            config,
            root_table: root_table.to_string(),
            dialect: config.dialect,
            param_mode,
            joins: Vec::new(),
            join_clauses: HashSet::new(),
            processed_tables: vec![root_table.to_string()],
            alias_sources: HashMap::new(),
            outer_tables: Vec::new(),
            expressions: HashMap::new(),
            params: Vec::new(),
        })
    }

    /// The config table behind an effective (possibly aliased) name.
    pub fn config_table_of<'b>(&'b self, effective: &'b str) -> &'b str {
        self.alias_sources
            .get(effective)
            .map(String::as_str)
            .unwrap_or(effective)
    }

    /// Look up an enclosing query's table by effective name.
    pub fn outer_table(&self, effective: &str) -> Option<&str> {
        self.outer_tables
            .iter()
            .find(|(name, _)| name == effective)
            .map(|(_, cfg)| cfg.as_str())
    }

    /// Register a fragment's semantic type. Disagreeing duplicates indicate
    /// a compiler bug. Bare placeholders are not fragments: on SQLite every
    /// parameter renders as `?`, so they carry no stable type.
    pub fn record(&mut self, sql: &str, ty: SemanticType) -> Result<()> {
        if is_placeholder_fragment(sql) {
            return Ok(());
        }
        match self.expressions.get(sql) {
            None => {
                self.expressions.insert(sql.to_string(), ty);
                Ok(())
            }
            Some(existing) if *existing == ty => Ok(()),
            Some(SemanticType::Unknown) => {
                self.expressions.insert(sql.to_string(), ty);
                Ok(())
            }
            Some(_) if ty == SemanticType::Unknown => Ok(()),
            Some(existing) => Err(Error::Internal(format!(
                "type map collision for fragment '{}': {} vs {}",
                sql, existing, ty
            ))),
        }
    }

    /// Collect a parameter and return its placeholder.
    pub fn push_param(&mut self, value: Primitive) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    // =========================================================================
    // Join planning
    // =========================================================================

    /// Synthesize (or reuse) the LEFT JOIN linking `current` to `partner`,
    /// returning the partner's effective name in this statement.
    ///
    /// Clauses are uniqued by textual form. A partner already placed in the
    /// statement under a different parent gets a numeric alias.
    pub fn ensure_join(&mut self, current: &str, partner: &str) -> Result<String> {
        if self.config.data_table.is_some() {
            return Err(Error::DataTableJoin);
        }
        let current_config = self.config_table_of(current).to_string();
        let (_, current_field, partner_field) = self
            .config
            .relationship(&current_config, partner)
            .ok_or_else(|| Error::NoRelationship {
                from: current_config.clone(),
                to: partner.to_string(),
            })?;
        let (current_field, partner_field) =
            (current_field.to_string(), partner_field.to_string());

        let plain = format!(
            "LEFT JOIN {} ON {}.{} = {}.{}",
            partner, current, current_field, partner, partner_field
        );
        if self.join_clauses.contains(&plain) {
            return Ok(partner.to_string());
        }

        let (effective, clause) = if self.processed_tables.iter().any(|t| t == partner) {
            let alias = format!("{}_{}", partner, self.processed_tables.len() + 1);
            let clause = format!(
                "LEFT JOIN {} AS {} ON {}.{} = {}.{}",
                partner, alias, current, current_field, alias, partner_field
            );
            (alias, clause)
        } else {
            (partner.to_string(), plain)
        };

        if self.join_clauses.insert(clause.clone()) {
            self.joins.push(clause);
        }
        self.processed_tables.push(effective.clone());
        if effective != partner {
            self.alias_sources
                .insert(effective.clone(), partner.to_string());
        }
        Ok(effective)
    }

    // =========================================================================
    // Subqueries
    // =========================================================================

    /// A child state for an `$exists` subquery over `target`. The child
    /// shares the compile-wide param list and type map (moved in, handed
    /// back by [`Self::absorb`]); the enclosing tables stay referencable.
    pub fn subquery(&mut self, target: &str) -> Result<ParserState<'a>> {
        self.config.table(target)?;
        let mut outer = self.outer_tables.clone();
        for effective in &self.processed_tables {
            outer.push((
                effective.clone(),
                self.config_table_of(effective).to_string(),
            ));
        }
        Ok(ParserState {
            config: self.config,
            root_table: target.to_string(),
            dialect: self.dialect,
            param_mode: self.param_mode,
            joins: Vec::new(),
            join_clauses: HashSet::new(),
            processed_tables: vec![target.to_string()],
            alias_sources: HashMap::new(),
            outer_tables: outer,
            expressions: std::mem::take(&mut self.expressions),
            params: std::mem::take(&mut self.params),
        })
    }

    /// Take back the shared state from a finished subquery child.
    pub fn absorb(&mut self, child: ParserState<'a>) {
        self.expressions = child.expressions;
        self.params = child.params;
    }
}

fn is_placeholder_fragment(sql: &str) -> bool {
    sql == "?"
        || (sql.len() > 1
            && sql.starts_with('$')
            && sql[1..].chars().all(|c| c.is_ascii_digit()))
}
