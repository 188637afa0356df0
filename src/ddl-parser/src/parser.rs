// Copyright 2018 sqlparser-rs contributors. All rights reserved.
// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// This file is derived from the sqlparser-rs project, available at
// https://github.com/andygrove/sqlparser-rs. It was incorporated
// directly into Materialize on December 21, 2019.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SQL parser.
//!
//! A hand-written recursive descent parser for the DDL statements in
//! [`crate::ast`]. The parser only checks syntax; whether the named objects
//! exist is decided later against a catalog.

use itertools::Itertools;
use tracing::trace;

use crate::ast::{
    AlterStatisticsAction, AlterStatisticsStatement, CreateSchemaStatement,
    CreateStatisticsStatement, DropStatisticsStatement, Ident, Statement, StatisticsKind,
    UnresolvedItemName,
};
use crate::keywords::Keyword;
use crate::lexer::{self, Token};

/// An error produced while lexing or parsing SQL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParserError {
    /// The byte offset in the input at which the error occurred.
    pub pos: usize,
    /// The error message.
    pub message: String,
}

impl ParserError {
    pub fn new<S>(pos: usize, message: S) -> ParserError
    where
        S: Into<String>,
    {
        ParserError {
            pos,
            message: message.into(),
        }
    }
}

/// Parses a `;`-separated script into its statements.
pub fn parse_statements(sql: &str) -> Result<Vec<Statement>, ParserError> {
    let tokens = lexer::lex(sql)?;
    trace!(sql, tokens = tokens.len(), "parsing statements");
    let mut parser = Parser::new(sql, tokens);
    let mut stmts = Vec::new();
    loop {
        while parser.consume_token(&Token::Semicolon) {}
        if parser.peek_token().is_none() {
            break;
        }
        stmts.push(parser.parse_statement()?);
        if parser.peek_token().is_some() && !parser.consume_token(&Token::Semicolon) {
            return parser.expected(parser.peek_pos(), "end of statement", parser.peek_token());
        }
    }
    Ok(stmts)
}

/// Parses exactly one statement, optionally followed by a semicolon.
pub fn parse_statement(sql: &str) -> Result<Statement, ParserError> {
    let mut stmts = parse_statements(sql)?;
    match stmts.len() {
        1 => Ok(stmts.remove(0)),
        n => Err(ParserError::new(
            0,
            format!("expected exactly one statement, found {n}"),
        )),
    }
}

struct Parser<'a> {
    sql: &'a str,
    tokens: Vec<(Token, usize)>,
    index: usize,
}

impl<'a> Parser<'a> {
    fn new(sql: &'a str, tokens: Vec<(Token, usize)>) -> Parser<'a> {
        Parser {
            sql,
            tokens,
            index: 0,
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        let pos = self.peek_pos();
        match self.next_token() {
            Some(Token::Keyword(Keyword::Create)) => {
                if self.parse_keyword(Keyword::Statistics) {
                    Ok(Statement::CreateStatistics(self.parse_create_statistics()?))
                } else if self.parse_keyword(Keyword::Schema) {
                    Ok(Statement::CreateSchema(self.parse_create_schema()?))
                } else {
                    self.expected(self.peek_pos(), "STATISTICS or SCHEMA after CREATE", self.peek_token())
                }
            }
            Some(Token::Keyword(Keyword::Alter)) => {
                self.expect_keyword(Keyword::Statistics)?;
                Ok(Statement::AlterStatistics(self.parse_alter_statistics()?))
            }
            Some(Token::Keyword(Keyword::Drop)) => {
                self.expect_keyword(Keyword::Statistics)?;
                Ok(Statement::DropStatistics(self.parse_drop_statistics()?))
            }
            token => self.expected(pos, "CREATE, ALTER or DROP", token),
        }
    }

    fn parse_create_statistics(&mut self) -> Result<CreateStatisticsStatement, ParserError> {
        let if_not_exists = self.parse_keywords(&[Keyword::If, Keyword::Not, Keyword::Exists]);
        let name = self.parse_item_name()?;
        let mut kinds = vec![];
        if self.consume_token(&Token::LParen) {
            kinds = self.parse_comma_separated(|parser| {
                let pos = parser.peek_pos();
                let ident = parser.parse_identifier()?;
                StatisticsKind::from_ident(&ident).ok_or_else(|| {
                    ParserError::new(
                        pos,
                        format!("unrecognized statistics kind \"{}\"", ident.as_str()),
                    )
                })
            })?;
            self.expect_token(&Token::RParen)?;
        }
        self.expect_keyword(Keyword::On)?;
        let columns = self.parse_comma_separated(Parser::parse_identifier)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.parse_item_name()?;
        Ok(CreateStatisticsStatement {
            if_not_exists,
            name,
            kinds,
            columns,
            table,
        })
    }

    fn parse_alter_statistics(&mut self) -> Result<AlterStatisticsStatement, ParserError> {
        let if_exists = self.parse_keywords(&[Keyword::If, Keyword::Exists]);
        let name = self.parse_item_name()?;
        let action = if self.parse_keyword(Keyword::Rename) {
            self.expect_keyword(Keyword::To)?;
            AlterStatisticsAction::RenameTo(self.parse_identifier()?)
        } else if self.parse_keyword(Keyword::Owner) {
            self.expect_keyword(Keyword::To)?;
            AlterStatisticsAction::OwnerTo(self.parse_identifier()?)
        } else if self.parse_keyword(Keyword::Set) {
            if self.parse_keyword(Keyword::Schema) {
                AlterStatisticsAction::SetSchema(self.parse_identifier()?)
            } else if self.parse_keyword(Keyword::Statistics) {
                AlterStatisticsAction::SetStatistics(self.parse_signed_integer()?)
            } else {
                return self.expected(
                    self.peek_pos(),
                    "SCHEMA or STATISTICS after SET",
                    self.peek_token(),
                );
            }
        } else {
            return self.expected(self.peek_pos(), "RENAME, OWNER or SET", self.peek_token());
        };
        Ok(AlterStatisticsStatement {
            if_exists,
            name,
            action,
        })
    }

    fn parse_drop_statistics(&mut self) -> Result<DropStatisticsStatement, ParserError> {
        let if_exists = self.parse_keywords(&[Keyword::If, Keyword::Exists]);
        let names = self.parse_comma_separated(Parser::parse_item_name)?;
        let cascade = if self.parse_keyword(Keyword::Cascade) {
            true
        } else {
            self.parse_keyword(Keyword::Restrict);
            false
        };
        Ok(DropStatisticsStatement {
            if_exists,
            names,
            cascade,
        })
    }

    fn parse_create_schema(&mut self) -> Result<CreateSchemaStatement, ParserError> {
        let if_not_exists = self.parse_keywords(&[Keyword::If, Keyword::Not, Keyword::Exists]);
        let name = self.parse_identifier()?;
        let authorization = if self.parse_keyword(Keyword::Authorization) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        Ok(CreateSchemaStatement {
            if_not_exists,
            name,
            authorization,
        })
    }

    /// Parses a possibly schema-qualified item name.
    fn parse_item_name(&mut self) -> Result<UnresolvedItemName, ParserError> {
        let pos = self.peek_pos();
        let mut idents = vec![self.parse_identifier()?];
        while self.consume_token(&Token::Dot) {
            idents.push(self.parse_identifier()?);
        }
        if idents.len() > 2 {
            let name = idents.iter().map(|i| i.as_str()).join(".");
            return Err(ParserError::new(
                pos,
                format!("improper qualified name (too many dotted names): {name}"),
            ));
        }
        Ok(UnresolvedItemName(idents))
    }

    fn parse_identifier(&mut self) -> Result<Ident, ParserError> {
        let pos = self.peek_pos();
        match self.next_token() {
            Some(Token::Ident(id)) => Ok(Ident::new(id)),
            Some(Token::Keyword(kw)) if !kw.is_reserved() => {
                Ok(Ident::new(kw.as_str().to_lowercase()))
            }
            token => self.expected(pos, "identifier", token),
        }
    }

    fn parse_signed_integer(&mut self) -> Result<i32, ParserError> {
        let pos = self.peek_pos();
        let negative = self.consume_token(&Token::Minus);
        match self.next_token() {
            Some(Token::Number(digits)) => digits
                .parse::<i64>()
                .ok()
                .map(|n| if negative { -n } else { n })
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| ParserError::new(pos, "integer out of range")),
            token => self.expected(self.prev_pos(), "integer", token),
        }
    }

    fn parse_comma_separated<T, F>(&mut self, mut f: F) -> Result<Vec<T>, ParserError>
    where
        F: FnMut(&mut Parser<'a>) -> Result<T, ParserError>,
    {
        let mut values = vec![f(self)?];
        while self.consume_token(&Token::Comma) {
            values.push(f(self)?);
        }
        Ok(values)
    }

    fn expected<T>(
        &self,
        pos: usize,
        expected: &str,
        found: Option<Token>,
    ) -> Result<T, ParserError> {
        let found = match found {
            Some(token) if token.has_value() => {
                format!("{} \"{}\"", token.name(), token.value())
            }
            Some(token) => token.name().to_string(),
            None => "EOF".to_string(),
        };
        Err(ParserError::new(
            pos,
            format!("Expected {expected}, found {found}"),
        ))
    }

    fn parse_keyword(&mut self, expected: Keyword) -> bool {
        match self.peek_token() {
            Some(Token::Keyword(kw)) if kw == expected => {
                self.index += 1;
                true
            }
            _ => false,
        }
    }

    /// Consumes all of `keywords` or none of them.
    fn parse_keywords(&mut self, keywords: &[Keyword]) -> bool {
        let index = self.index;
        for keyword in keywords {
            if !self.parse_keyword(*keyword) {
                self.index = index;
                return false;
            }
        }
        true
    }

    fn expect_keyword(&mut self, expected: Keyword) -> Result<(), ParserError> {
        if self.parse_keyword(expected) {
            Ok(())
        } else {
            self.expected(self.peek_pos(), expected.as_str(), self.peek_token())
        }
    }

    fn consume_token(&mut self, expected: &Token) -> bool {
        match self.peek_token() {
            Some(token) if token == *expected => {
                self.index += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), ParserError> {
        if self.consume_token(expected) {
            Ok(())
        } else {
            self.expected(self.peek_pos(), expected.name(), self.peek_token())
        }
    }

    fn peek_token(&self) -> Option<Token> {
        self.tokens.get(self.index).map(|(token, _)| token.clone())
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.peek_token();
        self.index += 1;
        token
    }

    /// The byte offset of the next token, or the end of the input.
    fn peek_pos(&self) -> usize {
        self.tokens
            .get(self.index)
            .map(|(_, pos)| *pos)
            .unwrap_or(self.sql.len())
    }

    /// The byte offset of the most recently consumed token.
    fn prev_pos(&self) -> usize {
        self.index
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, pos)| *pos)
            .unwrap_or(self.sql.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::display::AstDisplay;

    #[test]
    fn parses_alter_variants() {
        let stmt = parse_statement("ALTER STATISTICS IF EXISTS s.st SET STATISTICS -1").unwrap();
        assert_eq!(
            stmt,
            Statement::AlterStatistics(AlterStatisticsStatement {
                if_exists: true,
                name: UnresolvedItemName::qualified("s", "st"),
                action: AlterStatisticsAction::SetStatistics(-1),
            })
        );

        let stmt = parse_statement("alter statistics st owner to schema").unwrap();
        assert_eq!(stmt.to_ast_string(), "ALTER STATISTICS st OWNER TO schema");
    }

    #[test]
    fn integer_bounds() {
        let stmt = parse_statement("ALTER STATISTICS st SET STATISTICS -2147483648").unwrap();
        assert_eq!(stmt.to_ast_string(), "ALTER STATISTICS st SET STATISTICS -2147483648");
        let err = parse_statement("ALTER STATISTICS st SET STATISTICS 2147483648").unwrap_err();
        assert_eq!(err.message, "integer out of range");
        assert_eq!(err.pos, 35);
    }

    #[test]
    fn statement_count() {
        assert_eq!(parse_statements(";;").unwrap(), vec![]);
        let err = parse_statement("DROP STATISTICS a; DROP STATISTICS b").unwrap_err();
        assert_eq!(err.message, "expected exactly one statement, found 2");
    }
}
