//! Typed abstract syntax tree for the SQL dialect.
//!
//! Every node renders back to SQL via `Display`; reparsing the rendered
//! text yields a structurally equal tree. The executor also uses the
//! rendered form of projection expressions as result column names.

use std::fmt;

use crate::value::Value;

/// A parsed SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTableStmt),
    DropTable(DropTableStmt),
    Insert(InsertStmt),
    Select(SelectStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub table_name: String,
    pub columns: Vec<ColumnDef>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStmt {
    pub table_name: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table_name: String,
    /// Explicit column list, or `None` for schema order.
    pub columns: Option<Vec<String>>,
    /// One expression list per inserted row.
    pub values: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub columns: Vec<Expr>,
    /// `None` for a constant SELECT without FROM.
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table_name: String,
    pub assignments: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table_name: String,
    pub where_clause: Option<Expr>,
}

/// Column definition inside CREATE TABLE. Constraint flags are recorded
/// as written; normalization (PRIMARY KEY implies UNIQUE NOT NULL)
/// happens when the schema is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: crate::value::DataType,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// The name columns of this table are qualified with: the alias when
    /// one was given, the table name otherwise.
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: TableRef,
    /// Absent for CROSS JOIN; a missing condition on other joins matches
    /// every row pair.
    pub condition: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: TableRef,
    pub joins: Vec<JoinClause>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub column: ColumnRef,
    pub direction: OrderDirection,
}

/// A column reference, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    IsNull,
    IsNotNull,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(ColumnRef),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `*` or `table.*` in a select list.
    Star { table: Option<String> },
}

impl Expr {
    /// Binding strength, used to decide where `Display` needs parentheses.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op: BinaryOp::Or, .. } => 1,
            Expr::Binary { op: BinaryOp::And, .. } => 2,
            Expr::Unary { op: UnaryOp::Not, .. } => 3,
            Expr::Binary { .. } => 4,
            Expr::Unary { .. } => 4,
            Expr::Literal(_) | Expr::Column(_) | Expr::Star { .. } => 5,
        }
    }
}

// ===== Display =====

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Like => "LIKE",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{t}.{}", self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Renders a literal so the lexer reads it back as the same value: reals
/// keep a decimal point, text goes in single quotes with quotes doubled
/// and backslashes escaped.
fn fmt_literal(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => write!(f, "NULL"),
        Value::Integer(i) => write!(f, "{i}"),
        Value::Real(r) => {
            if r.fract() == 0.0 && r.is_finite() {
                write!(f, "{r:.1}")
            } else {
                write!(f, "{r}")
            }
        }
        Value::Text(s) => {
            write!(f, "'")?;
            for ch in s.chars() {
                match ch {
                    '\'' => write!(f, "''")?,
                    '\\' => write!(f, "\\\\")?,
                    c => write!(f, "{c}")?,
                }
            }
            write!(f, "'")
        }
        Value::Boolean(true) => write!(f, "TRUE"),
        Value::Boolean(false) => write!(f, "FALSE"),
    }
}

/// Writes a child expression, parenthesizing it when its precedence falls
/// below what the surrounding operator requires.
fn fmt_operand(expr: &Expr, min_prec: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if expr.precedence() < min_prec {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => fmt_literal(v, f),
            Expr::Column(c) => write!(f, "{c}"),
            Expr::Binary { left, op, right } => {
                let prec = self.precedence();
                // AND/OR chains are left-associative; comparisons are not
                // associative at all, so both sides get the stricter bound.
                let (left_min, right_min) = match op {
                    BinaryOp::And | BinaryOp::Or => (prec, prec + 1),
                    _ => (prec + 1, prec + 1),
                };
                fmt_operand(left, left_min, f)?;
                write!(f, " {op} ")?;
                fmt_operand(right, right_min, f)
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    write!(f, "NOT ")?;
                    fmt_operand(operand, 3, f)
                }
                UnaryOp::IsNull => {
                    fmt_operand(operand, 5, f)?;
                    write!(f, " IS NULL")
                }
                UnaryOp::IsNotNull => {
                    fmt_operand(operand, 5, f)?;
                    write!(f, " IS NOT NULL")
                }
            },
            Expr::Star { table } => match table {
                Some(t) => write!(f, "{t}.*"),
                None => write!(f, "*"),
            },
        }
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if self.primary_key {
            write!(f, " PRIMARY KEY")?;
        }
        if self.unique {
            write!(f, " UNIQUE")?;
        }
        if self.not_null {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} AS {alias}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kw = match self.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Cross => "CROSS JOIN",
        };
        write!(f, "{kw} {}", self.table)?;
        if let Some(cond) = &self.condition {
            write!(f, " ON {cond}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        for join in &self.joins {
            write!(f, " {join}")?;
        }
        Ok(())
    }
}

impl fmt::Display for OrderByItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        };
        write!(f, "{} {dir}", self.column)
    }
}

fn join_displayed<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateTable(stmt) => {
                write!(f, "CREATE TABLE ")?;
                if stmt.if_not_exists {
                    write!(f, "IF NOT EXISTS ")?;
                }
                write!(f, "{} ({})", stmt.table_name, join_displayed(&stmt.columns))
            }
            Statement::DropTable(stmt) => {
                write!(f, "DROP TABLE ")?;
                if stmt.if_exists {
                    write!(f, "IF EXISTS ")?;
                }
                write!(f, "{}", stmt.table_name)
            }
            Statement::Insert(stmt) => {
                write!(f, "INSERT INTO {}", stmt.table_name)?;
                if let Some(cols) = &stmt.columns {
                    write!(f, " ({})", cols.join(", "))?;
                }
                write!(f, " VALUES ")?;
                let rows = stmt
                    .values
                    .iter()
                    .map(|row| format!("({})", join_displayed(row)))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{rows}")
            }
            Statement::Select(stmt) => {
                write!(f, "SELECT {}", join_displayed(&stmt.columns))?;
                if let Some(from) = &stmt.from {
                    write!(f, " FROM {from}")?;
                }
                if let Some(where_clause) = &stmt.where_clause {
                    write!(f, " WHERE {where_clause}")?;
                }
                if !stmt.order_by.is_empty() {
                    write!(f, " ORDER BY {}", join_displayed(&stmt.order_by))?;
                }
                if let Some(limit) = stmt.limit {
                    write!(f, " LIMIT {limit}")?;
                }
                if let Some(offset) = stmt.offset {
                    write!(f, " OFFSET {offset}")?;
                }
                Ok(())
            }
            Statement::Update(stmt) => {
                let sets = stmt
                    .assignments
                    .iter()
                    .map(|(col, expr)| format!("{col} = {expr}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "UPDATE {} SET {sets}", stmt.table_name)?;
                if let Some(where_clause) = &stmt.where_clause {
                    write!(f, " WHERE {where_clause}")?;
                }
                Ok(())
            }
            Statement::Delete(stmt) => {
                write!(f, "DELETE FROM {}", stmt.table_name)?;
                if let Some(where_clause) = &stmt.where_clause {
                    write!(f, " WHERE {where_clause}")?;
                }
                Ok(())
            }
        }
    }
}
