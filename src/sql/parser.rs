//! Recursive-descent SQL parser — token stream to AST.
//!
//! One-token lookahead with an occasional `peek(n)`. Each parse error
//! carries the offending token's 1-based position and what was expected.

use crate::error::{RelicError, RelicResult};
use crate::sql::ast::{
    BinaryOp, ColumnDef, ColumnRef, CreateTableStmt, DeleteStmt, DropTableStmt, Expr, FromClause,
    InsertStmt, JoinClause, JoinType, OrderByItem, OrderDirection, SelectStmt, Statement, TableRef,
    UnaryOp, UpdateStmt,
};
use crate::sql::lexer::{Lexer, Token, TokenKind};
use crate::value::{DataType, Value};

/// Parses SQL text into [`Statement`]s.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Convenience wrapper: lex and parse a single statement.
pub fn parse(sql: &str) -> RelicResult<Statement> {
    Parser::new(sql)?.parse()
}

impl Parser {
    /// Lexes the input; tokenization errors surface here.
    pub fn new(sql: &str) -> RelicResult<Self> {
        let tokens = Lexer::new(sql).tokenize()?;
        Ok(Parser { tokens, pos: 0 })
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self, offset: usize) -> &Token {
        let pos = self.pos + offset;
        &self.tokens[pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn consume_if(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> RelicResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error_at_current(&format!("expected {what}, got {:?}", self.current().kind)))
    }

    fn error_at_current(&self, message: &str) -> RelicError {
        let token = self.current();
        RelicError::Syntax {
            message: message.to_string(),
            line: token.line,
            column: token.column,
        }
    }

    /// Parses a single statement with an optional trailing semicolon.
    /// Trailing tokens after the statement are rejected.
    pub fn parse(&mut self) -> RelicResult<Statement> {
        let stmt = self.parse_statement()?;
        self.consume_if(TokenKind::Semicolon);
        if !self.check(TokenKind::Eof) {
            return Err(self.error_at_current(&format!(
                "unexpected trailing input: {:?}",
                self.current().kind
            )));
        }
        Ok(stmt)
    }

    fn parse_statement(&mut self) -> RelicResult<Statement> {
        match self.current().kind {
            TokenKind::Select => self.parse_select().map(Statement::Select),
            TokenKind::Insert => self.parse_insert().map(Statement::Insert),
            TokenKind::Update => self.parse_update().map(Statement::Update),
            TokenKind::Delete => self.parse_delete().map(Statement::Delete),
            TokenKind::Create => self.parse_create().map(Statement::CreateTable),
            TokenKind::Drop => self.parse_drop().map(Statement::DropTable),
            kind => Err(self.error_at_current(&format!("unexpected token: {kind:?}"))),
        }
    }

    // ===== CREATE TABLE / DROP TABLE =====

    fn parse_create(&mut self) -> RelicResult<CreateTableStmt> {
        self.expect(TokenKind::Create, "CREATE")?;
        self.expect(TokenKind::Table, "TABLE")?;

        let if_not_exists = if self.check(TokenKind::If) {
            self.advance();
            self.expect(TokenKind::Not, "NOT")?;
            self.expect(TokenKind::Exists, "EXISTS")?;
            true
        } else {
            false
        };

        let table_name = self.expect(TokenKind::Identifier, "table name")?.text;

        self.expect(TokenKind::LParen, "'('")?;
        let mut columns = vec![self.parse_column_def()?];
        while self.consume_if(TokenKind::Comma) {
            columns.push(self.parse_column_def()?);
        }
        self.expect(TokenKind::RParen, "')'")?;

        Ok(CreateTableStmt {
            table_name,
            columns,
            if_not_exists,
        })
    }

    fn parse_column_def(&mut self) -> RelicResult<ColumnDef> {
        let name = self.expect(TokenKind::Identifier, "column name")?.text;

        if !self.current().kind.is_type_keyword() {
            return Err(self.error_at_current(&format!(
                "expected data type, got {:?}",
                self.current().kind
            )));
        }
        let type_token = self.advance();
        let data_type = DataType::from_keyword(&type_token.text).ok_or_else(|| {
            RelicError::Syntax {
                message: format!("unknown data type: {}", type_token.text),
                line: type_token.line,
                column: type_token.column,
            }
        })?;

        // Constraints may appear in any order.
        let mut primary_key = false;
        let mut unique = false;
        let mut not_null = false;
        loop {
            if self.check(TokenKind::Primary) {
                self.advance();
                self.expect(TokenKind::Key, "KEY")?;
                primary_key = true;
            } else if self.consume_if(TokenKind::Unique) {
                unique = true;
            } else if self.check(TokenKind::Not) {
                self.advance();
                self.expect(TokenKind::Null, "NULL")?;
                not_null = true;
            } else {
                break;
            }
        }

        Ok(ColumnDef {
            name,
            data_type,
            primary_key,
            unique,
            not_null,
        })
    }

    fn parse_drop(&mut self) -> RelicResult<DropTableStmt> {
        self.expect(TokenKind::Drop, "DROP")?;
        self.expect(TokenKind::Table, "TABLE")?;

        let if_exists = if self.check(TokenKind::If) {
            self.advance();
            self.expect(TokenKind::Exists, "EXISTS")?;
            true
        } else {
            false
        };

        let table_name = self.expect(TokenKind::Identifier, "table name")?.text;
        Ok(DropTableStmt {
            table_name,
            if_exists,
        })
    }

    // ===== INSERT =====

    fn parse_insert(&mut self) -> RelicResult<InsertStmt> {
        self.expect(TokenKind::Insert, "INSERT")?;
        self.expect(TokenKind::Into, "INTO")?;

        let table_name = self.expect(TokenKind::Identifier, "table name")?.text;

        let columns = if self.consume_if(TokenKind::LParen) {
            let mut cols = vec![self.expect(TokenKind::Identifier, "column name")?.text];
            while self.consume_if(TokenKind::Comma) {
                cols.push(self.expect(TokenKind::Identifier, "column name")?.text);
            }
            self.expect(TokenKind::RParen, "')'")?;
            Some(cols)
        } else {
            None
        };

        self.expect(TokenKind::Values, "VALUES")?;

        let mut values = vec![self.parse_value_list()?];
        while self.consume_if(TokenKind::Comma) {
            values.push(self.parse_value_list()?);
        }

        Ok(InsertStmt {
            table_name,
            columns,
            values,
        })
    }

    fn parse_value_list(&mut self) -> RelicResult<Vec<Expr>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut values = vec![self.parse_expression()?];
        while self.consume_if(TokenKind::Comma) {
            values.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(values)
    }

    // ===== SELECT =====

    fn parse_select(&mut self) -> RelicResult<SelectStmt> {
        self.expect(TokenKind::Select, "SELECT")?;

        let mut columns = vec![self.parse_select_item()?];
        while self.consume_if(TokenKind::Comma) {
            columns.push(self.parse_select_item()?);
        }

        let from = if self.check(TokenKind::From) {
            Some(self.parse_from_clause()?)
        } else {
            None
        };

        let where_clause = if self.consume_if(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.check(TokenKind::Order) {
            self.advance();
            self.expect(TokenKind::By, "BY")?;
            order_by.push(self.parse_order_by_item()?);
            while self.consume_if(TokenKind::Comma) {
                order_by.push(self.parse_order_by_item()?);
            }
        }

        let limit = if self.consume_if(TokenKind::Limit) {
            Some(self.parse_count("LIMIT")?)
        } else {
            None
        };

        let offset = if self.consume_if(TokenKind::Offset) {
            Some(self.parse_count("OFFSET")?)
        } else {
            None
        };

        Ok(SelectStmt {
            columns,
            from,
            where_clause,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_count(&mut self, clause: &str) -> RelicResult<u64> {
        let token = self.expect(TokenKind::Number, "row count")?;
        token.text.parse::<u64>().map_err(|_| RelicError::Syntax {
            message: format!("{clause} expects a non-negative integer, got {}", token.text),
            line: token.line,
            column: token.column,
        })
    }

    /// A select item: `*`, `table.*`, a (possibly qualified) column, or
    /// any expression.
    fn parse_select_item(&mut self) -> RelicResult<Expr> {
        if self.consume_if(TokenKind::Star) {
            return Ok(Expr::Star { table: None });
        }
        if self.check(TokenKind::Identifier) && self.peek(1).kind == TokenKind::Dot {
            if self.peek(2).kind == TokenKind::Star {
                let table = self.advance().text;
                self.advance(); // .
                self.advance(); // *
                return Ok(Expr::Star { table: Some(table) });
            }
        }
        self.parse_expression()
    }

    fn parse_from_clause(&mut self) -> RelicResult<FromClause> {
        self.expect(TokenKind::From, "FROM")?;

        let table = self.parse_table_ref()?;

        let mut joins = Vec::new();
        while matches!(
            self.current().kind,
            TokenKind::Join | TokenKind::Inner | TokenKind::Left | TokenKind::Right | TokenKind::Cross
        ) {
            joins.push(self.parse_join()?);
        }

        Ok(FromClause { table, joins })
    }

    fn parse_table_ref(&mut self) -> RelicResult<TableRef> {
        let name = self.expect(TokenKind::Identifier, "table name")?.text;

        let alias = if self.consume_if(TokenKind::As) {
            Some(self.expect(TokenKind::Identifier, "alias")?.text)
        } else if self.check(TokenKind::Identifier) {
            Some(self.advance().text)
        } else {
            None
        };

        Ok(TableRef { name, alias })
    }

    fn parse_join(&mut self) -> RelicResult<JoinClause> {
        let join_type = match self.current().kind {
            TokenKind::Left => {
                self.advance();
                JoinType::Left
            }
            TokenKind::Right => {
                self.advance();
                JoinType::Right
            }
            TokenKind::Cross => {
                self.advance();
                JoinType::Cross
            }
            TokenKind::Inner => {
                self.advance();
                JoinType::Inner
            }
            _ => JoinType::Inner,
        };
        self.expect(TokenKind::Join, "JOIN")?;

        let table = self.parse_table_ref()?;

        let condition = if self.consume_if(TokenKind::On) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(JoinClause {
            join_type,
            table,
            condition,
        })
    }

    fn parse_order_by_item(&mut self) -> RelicResult<OrderByItem> {
        let column = self.parse_column_ref()?;

        let direction = if self.consume_if(TokenKind::Desc) {
            OrderDirection::Desc
        } else {
            self.consume_if(TokenKind::Asc);
            OrderDirection::Asc
        };

        Ok(OrderByItem { column, direction })
    }

    fn parse_column_ref(&mut self) -> RelicResult<ColumnRef> {
        let name = self.expect(TokenKind::Identifier, "column name")?.text;
        if self.consume_if(TokenKind::Dot) {
            let column = self.expect(TokenKind::Identifier, "column name")?.text;
            return Ok(ColumnRef {
                table: Some(name),
                column,
            });
        }
        Ok(ColumnRef {
            table: None,
            column: name,
        })
    }

    // ===== UPDATE / DELETE =====

    fn parse_update(&mut self) -> RelicResult<UpdateStmt> {
        self.expect(TokenKind::Update, "UPDATE")?;
        let table_name = self.expect(TokenKind::Identifier, "table name")?.text;
        self.expect(TokenKind::Set, "SET")?;

        let mut assignments = vec![self.parse_assignment()?];
        while self.consume_if(TokenKind::Comma) {
            assignments.push(self.parse_assignment()?);
        }

        let where_clause = if self.consume_if(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(UpdateStmt {
            table_name,
            assignments,
            where_clause,
        })
    }

    fn parse_assignment(&mut self) -> RelicResult<(String, Expr)> {
        let column = self.expect(TokenKind::Identifier, "column name")?.text;
        self.expect(TokenKind::Eq, "'='")?;
        let value = self.parse_expression()?;
        Ok((column, value))
    }

    fn parse_delete(&mut self) -> RelicResult<DeleteStmt> {
        self.expect(TokenKind::Delete, "DELETE")?;
        self.expect(TokenKind::From, "FROM")?;
        let table_name = self.expect(TokenKind::Identifier, "table name")?.text;

        let where_clause = if self.consume_if(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(DeleteStmt {
            table_name,
            where_clause,
        })
    }

    // ===== Expressions =====
    //
    // Precedence, lowest first: OR, AND, NOT, comparison, primary.

    fn parse_expression(&mut self) -> RelicResult<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> RelicResult<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.consume_if(TokenKind::Or) {
            let right = self.parse_and_expr()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> RelicResult<Expr> {
        let mut left = self.parse_not_expr()?;
        while self.consume_if(TokenKind::And) {
            let right = self.parse_not_expr()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> RelicResult<Expr> {
        if self.consume_if(TokenKind::Not) {
            let operand = self.parse_not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> RelicResult<Expr> {
        let left = self.parse_primary()?;

        if self.consume_if(TokenKind::Is) {
            let op = if self.consume_if(TokenKind::Not) {
                UnaryOp::IsNotNull
            } else {
                UnaryOp::IsNull
            };
            self.expect(TokenKind::Null, "NULL")?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(left),
            });
        }

        let op = match self.current().kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            TokenKind::Like => Some(BinaryOp::Like),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_primary()?;
            return Ok(Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> RelicResult<Expr> {
        if self.consume_if(TokenKind::LParen) {
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(expr);
        }
        if self.consume_if(TokenKind::Null) {
            return Ok(Expr::Literal(Value::Null));
        }
        if self.consume_if(TokenKind::True) {
            return Ok(Expr::Literal(Value::Boolean(true)));
        }
        if self.consume_if(TokenKind::False) {
            return Ok(Expr::Literal(Value::Boolean(false)));
        }
        if self.check(TokenKind::Number) {
            let token = self.advance();
            let value = if token.text.contains('.') {
                token.text.parse::<f64>().ok().map(Value::Real)
            } else {
                token.text.parse::<i64>().ok().map(Value::Integer)
            };
            return match value {
                Some(v) => Ok(Expr::Literal(v)),
                None => Err(RelicError::Syntax {
                    message: format!("invalid numeric literal: {}", token.text),
                    line: token.line,
                    column: token.column,
                }),
            };
        }
        if self.check(TokenKind::StringLit) {
            let token = self.advance();
            return Ok(Expr::Literal(Value::Text(token.text)));
        }
        if self.check(TokenKind::Identifier) {
            return self.parse_column_ref().map(Expr::Column);
        }
        Err(self.error_at_current(&format!("unexpected token: {:?}", self.current().kind)))
    }
}
