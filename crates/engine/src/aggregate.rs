//! Aggregation pipeline subset
//!
//! An ordered subset of pipeline stages, each rewriting the single SELECT
//! being built: Match (the filter compiler), AddFields (named derived
//! expressions recorded for later stages only), Group (grouping key plus
//! Sum/Avg/Count/Max/Min accumulators), Project (inclusions, array-size
//! expressions, dotted-path extraction, Add/Multiply arithmetic trees),
//! Sort, Limit, Skip.
//!
//! Stage shapes outside these enums are unrepresentable: where the
//! dynamic source silently ignored an unrecognized stage, this vocabulary
//! rejects it at construction time.

use crate::cursor::{SortOrder, MAX_ROWS_SENTINEL};
use crate::filter::{field_ref, parse_path, Filter};
use crate::pool::SqlValue;
use std::collections::BTreeMap;
use veneer_core::Value;

/// A derived-value expression
#[derive(Debug, Clone, PartialEq)]
pub enum AggExpr {
    /// A field reference (dotted paths extract from JSON columns); names
    /// recorded by an earlier AddFields stage resolve to their expression
    Field(String),
    /// A literal operand
    Literal(Value),
    /// Sum of operands
    Add(Vec<AggExpr>),
    /// Product of operands
    Multiply(Vec<AggExpr>),
    /// Length of the JSON array at a field
    Size(String),
}

impl AggExpr {
    fn compile(&self, derived: &BTreeMap<String, String>) -> String {
        match self {
            AggExpr::Field(name) => resolve_name(name, derived),
            AggExpr::Literal(value) => literal_sql(value),
            AggExpr::Add(operands) => nary(operands, " + ", derived),
            AggExpr::Multiply(operands) => nary(operands, " * ", derived),
            AggExpr::Size(name) => {
                format!("JSON_LENGTH({})", field_ref(&parse_path(name), false))
            }
        }
    }
}

fn nary(operands: &[AggExpr], joiner: &str, derived: &BTreeMap<String, String>) -> String {
    let parts: Vec<String> = operands.iter().map(|e| e.compile(derived)).collect();
    format!("({})", parts.join(joiner))
}

fn resolve_name(name: &str, derived: &BTreeMap<String, String>) -> String {
    match derived.get(name) {
        Some(expr) => expr.clone(),
        None => field_ref(&parse_path(name), true),
    }
}

// Literals are inlined rather than bound so parameter order stays the
// declaration order of the WHERE clause.
fn literal_sql(value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other.to_json_text().replace('\'', "''")),
    }
}

/// Group-stage accumulators
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Sum of an expression (a field or a numeric literal)
    Sum(AggExpr),
    /// Average of an expression
    Avg(AggExpr),
    /// Smallest value of an expression
    Min(AggExpr),
    /// Largest value of an expression
    Max(AggExpr),
    /// Row count
    Count,
}

impl Accumulator {
    fn compile(&self, derived: &BTreeMap<String, String>) -> String {
        match self {
            Accumulator::Sum(e) => format!("SUM({})", e.compile(derived)),
            Accumulator::Avg(e) => format!("AVG({})", e.compile(derived)),
            Accumulator::Min(e) => format!("MIN({})", e.compile(derived)),
            Accumulator::Max(e) => format!("MAX({})", e.compile(derived)),
            Accumulator::Count => "COUNT(*)".to_string(),
        }
    }
}

/// Project-stage entries
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Include a field (dotted paths extract and alias)
    Include(String),
    /// A named computed expression
    Computed {
        /// Output column name
        name: String,
        /// The expression
        expr: AggExpr,
    },
}

/// One pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Filter rows (same compiler as Model::find)
    Match(Filter),
    /// Record named derived expressions for later stages
    AddFields(Vec<(String, AggExpr)>),
    /// Group rows by an optional field key, emitting accumulators
    Group {
        /// Grouping field; None collapses to a single group
        key: Option<String>,
        /// Named accumulators
        fields: Vec<(String, Accumulator)>,
    },
    /// Rewrite the emitted column list
    Project(Vec<Projection>),
    /// Order the result
    Sort(Vec<(String, SortOrder)>),
    /// Cap the result
    Limit(u64),
    /// Skip leading rows
    Skip(u64),
}

/// An ordered pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// An empty pipeline (selects every row unmodified)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw stage
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a Match stage
    pub fn matching(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    /// Append an AddFields stage
    pub fn add_fields(self, fields: Vec<(String, AggExpr)>) -> Self {
        self.stage(Stage::AddFields(fields))
    }

    /// Append a Group stage
    pub fn group(self, key: Option<&str>, fields: Vec<(String, Accumulator)>) -> Self {
        self.stage(Stage::Group {
            key: key.map(str::to_string),
            fields,
        })
    }

    /// Append a Project stage
    pub fn project(self, entries: Vec<Projection>) -> Self {
        self.stage(Stage::Project(entries))
    }

    /// Append a Sort stage
    pub fn sort(self, keys: Vec<(String, SortOrder)>) -> Self {
        self.stage(Stage::Sort(keys))
    }

    /// Append a Limit stage
    pub fn limit(self, n: u64) -> Self {
        self.stage(Stage::Limit(n))
    }

    /// Append a Skip stage
    pub fn skip(self, n: u64) -> Self {
        self.stage(Stage::Skip(n))
    }

    /// Stages in order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Compile the pipeline to one SELECT
    ///
    /// Stages apply in the order given, each rewriting the clause it
    /// owns; a later Group or Project replaces the column list a former
    /// one produced.
    pub(crate) fn compile(&self, table: &str, id_column: &str) -> (String, Vec<SqlValue>) {
        let mut select_list: Option<Vec<String>> = None;
        let mut where_parts: Vec<String> = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();
        let mut group_by: Option<String> = None;
        let mut order_by: Vec<String> = Vec::new();
        let mut limit: Option<u64> = None;
        let mut offset: Option<u64> = None;
        let mut derived: BTreeMap<String, String> = BTreeMap::new();

        for stage in &self.stages {
            match stage {
                Stage::Match(filter) => {
                    let (body, mut filter_params) = filter.compile(id_column);
                    if let Some(body) = body {
                        where_parts.push(body);
                        params.append(&mut filter_params);
                    }
                }
                Stage::AddFields(fields) => {
                    for (name, expr) in fields {
                        let compiled = expr.compile(&derived);
                        derived.insert(name.clone(), compiled);
                    }
                }
                Stage::Group { key, fields } => {
                    let mut list = Vec::new();
                    match key {
                        Some(key) => {
                            let key_sql = resolve_name(key, &derived);
                            list.push(format!("{key_sql} AS _id"));
                            group_by = Some(key_sql);
                        }
                        None => {
                            list.push("NULL AS _id".to_string());
                            group_by = None;
                        }
                    }
                    for (name, accumulator) in fields {
                        list.push(format!("{} AS {name}", accumulator.compile(&derived)));
                    }
                    select_list = Some(list);
                }
                Stage::Project(entries) => {
                    let mut list = Vec::new();
                    for entry in entries {
                        match entry {
                            Projection::Include(name) => {
                                if name.contains('.') || derived.contains_key(name) {
                                    list.push(format!(
                                        "{} AS '{name}'",
                                        resolve_name(name, &derived)
                                    ));
                                } else {
                                    list.push(name.clone());
                                }
                            }
                            Projection::Computed { name, expr } => {
                                list.push(format!("{} AS {name}", expr.compile(&derived)));
                            }
                        }
                    }
                    select_list = Some(list);
                }
                Stage::Sort(keys) => {
                    order_by = keys
                        .iter()
                        .map(|(name, order)| {
                            format!("{} {}", resolve_name(name, &derived), order.sql())
                        })
                        .collect();
                }
                Stage::Limit(n) => limit = Some(*n),
                Stage::Skip(n) => offset = Some(*n),
            }
        }

        let columns = match select_list {
            Some(list) if !list.is_empty() => list.join(", "),
            _ => "*".to_string(),
        };
        let mut sql = format!("SELECT {columns} FROM {table}");
        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }
        if let Some(key) = &group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(key);
        }
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }
        match (limit, offset) {
            (Some(limit), Some(skip)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {skip}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(skip)) => {
                sql.push_str(&format!(" LIMIT {MAX_ROWS_SENTINEL} OFFSET {skip}"))
            }
            (None, None) => {}
        }
        (sql, params)
    }
}
