//! Filter compiler.
//!
//! Turns a [`StateFilter`] into a conjunction of typed clauses using a
//! per-entity attribute table. Clause values become DataFusion literal
//! expressions in the logical plan; they are never formatted into SQL text.
//! Column names only ever come from the attribute table, so unrecognized
//! client keys are dropped instead of reaching the plan.

use std::collections::BTreeMap;
use std::fmt;

use datafusion::prelude::{Expr, col, lit};
use valo_types::{FilterValue, StateFilter};

use crate::error::QueryError;

/// Which store table a filter targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    AgentState,
    Round,
    Map,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AgentState => "agent state",
            Self::Round => "round",
            Self::Map => "map",
        })
    }
}

/// How an attribute is constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// Inclusive `[min, max]`
    Range,
    /// Membership in a list of strings
    OneOf,
    /// Boolean equality
    Flag,
}

impl AttrKind {
    fn shape(self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::OneOf => "list",
            Self::Flag => "boolean",
        }
    }
}

/// Attribute name → classification for one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    entries: BTreeMap<String, AttrKind>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, kind: AttrKind) -> Self {
        self.entries.insert(name.to_string(), kind);
        self
    }

    pub fn classify(&self, name: &str) -> Option<AttrKind> {
        self.entries.get(name).copied()
    }

    /// Columns of `agent_state` that can be filtered
    pub fn agent_state() -> Self {
        Self::new()
            .with("credits", AttrKind::Range)
            .with("health", AttrKind::Range)
            .with("armor", AttrKind::Range)
            .with("ult_points", AttrKind::Range)
            .with("c_util", AttrKind::Range)
            .with("q_util", AttrKind::Range)
            .with("e_util", AttrKind::Range)
            .with("agent_name", AttrKind::OneOf)
            .with("player_name", AttrKind::OneOf)
            .with("gun", AttrKind::OneOf)
            .with("is_attacking", AttrKind::Flag)
    }

    /// Round-level attributes. `frames_since_round_start` is applied to the
    /// matched frame set, the rest to `round_info`.
    pub fn round() -> Self {
        Self::new()
            .with("round_number", AttrKind::Range)
            .with(FRAME_OFFSET_ATTR, AttrKind::Range)
            .with("game_uuid", AttrKind::OneOf)
            .with("attackers_won", AttrKind::Flag)
    }

    pub fn map() -> Self {
        Self::new()
            .with("map_name", AttrKind::OneOf)
            .with("game_uuid", AttrKind::OneOf)
    }
}

/// Round attribute that lives on matched frames rather than `round_info`
pub const FRAME_OFFSET_ATTR: &str = "frames_since_round_start";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Range { min: i64, max: i64 },
    OneOf(Vec<String>),
    Equals(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub column: String,
    pub constraint: Constraint,
}

impl Clause {
    pub fn to_expr(&self) -> Expr {
        match &self.constraint {
            Constraint::Range { min, max } => col(self.column.as_str()).between(lit(*min), lit(*max)),
            // IN () is not valid; an empty allow-list matches nothing
            Constraint::OneOf(values) if values.is_empty() => lit(false),
            Constraint::OneOf(values) => col(self.column.as_str())
                .in_list(values.iter().map(|v| lit(v.as_str())).collect(), false),
            Constraint::Equals(flag) => col(self.column.as_str()).eq(lit(*flag)),
        }
    }

    /// Evaluate against an integer held outside the store
    pub fn matches_int(&self, value: i64) -> bool {
        match &self.constraint {
            Constraint::Range { min, max } => *min <= value && value <= *max,
            _ => false,
        }
    }
}

/// A non-empty conjunction of clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter {
    pub kind: EntityKind,
    clauses: Vec<Clause>,
}

impl CompiledFilter {
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Remove and return the clause for `column`, if any
    pub fn take_clause(&mut self, column: &str) -> Option<Clause> {
        let pos = self.clauses.iter().position(|c| c.column == column)?;
        Some(self.clauses.remove(pos))
    }

    /// AND of every clause; `None` once all clauses have been taken
    pub fn predicate(&self) -> Option<Expr> {
        self.clauses
            .iter()
            .map(Clause::to_expr)
            .reduce(|acc, expr| acc.and(expr))
    }
}

/// Holds the attribute tables for every entity kind.
///
/// Constructed once at startup and handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCompiler {
    agent_state: AttributeTable,
    round: AttributeTable,
    map: AttributeTable,
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self {
            agent_state: AttributeTable::agent_state(),
            round: AttributeTable::round(),
            map: AttributeTable::map(),
        }
    }
}

impl FilterCompiler {
    pub fn new(agent_state: AttributeTable, round: AttributeTable, map: AttributeTable) -> Self {
        Self {
            agent_state,
            round,
            map,
        }
    }

    pub fn table(&self, kind: EntityKind) -> &AttributeTable {
        match kind {
            EntityKind::AgentState => &self.agent_state,
            EntityKind::Round => &self.round,
            EntityKind::Map => &self.map,
        }
    }

    /// Compile a filter for `kind`.
    ///
    /// Unrecognized keys are skipped. A filter left with no clauses is an
    /// [`QueryError::UnrecognizedFilter`] for every entity kind.
    pub fn compile(
        &self,
        kind: EntityKind,
        filter: &StateFilter,
    ) -> Result<CompiledFilter, QueryError> {
        let table = self.table(kind);
        let mut clauses = Vec::new();

        for (key, value) in filter.iter() {
            let Some(attr) = table.classify(key) else {
                tracing::trace!(%kind, key, "Skipping unrecognized filter key");
                continue;
            };

            let constraint = match (attr, value) {
                (AttrKind::Range, FilterValue::Range([min, max])) => Constraint::Range {
                    min: *min,
                    max: *max,
                },
                (AttrKind::OneOf, FilterValue::List(values)) => Constraint::OneOf(values.clone()),
                (AttrKind::Flag, FilterValue::Flag(flag)) => Constraint::Equals(*flag),
                (attr, value) => {
                    return Err(QueryError::MismatchedFilterValue {
                        key: key.to_string(),
                        expected: attr.shape(),
                        found: value.shape(),
                    });
                }
            };
            clauses.push(Clause {
                column: key.to_string(),
                constraint,
            });
        }

        if clauses.is_empty() {
            return Err(QueryError::UnrecognizedFilter { kind });
        }
        Ok(CompiledFilter { kind, clauses })
    }
}
