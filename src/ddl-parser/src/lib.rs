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

//! DDL parser and deparser for the statements that the distributed
//! catalog propagates to worker nodes.
//!
//! The grammar is a small subset of PostgreSQL's: `CREATE`, `ALTER` and
//! `DROP STATISTICS`, plus `CREATE SCHEMA`, which is needed to recreate a
//! statistics object's schema on a worker before the object itself.
//!
//! Every AST node implements [`ast::display::AstDisplay`]. Rendering a node
//! and parsing the result yields a structurally equal node, which is what
//! allows the rendered text to be shipped to another node and replayed
//! there.
//!
//! ```
//! use mz_ddl_parser::ast::display::AstDisplay;
//! use mz_ddl_parser::parser;
//!
//! let stmt = parser::parse_statement("alter statistics s.st OWNER TO Alice").unwrap();
//! assert_eq!(stmt.to_ast_string(), "ALTER STATISTICS s.st OWNER TO alice");
//! ```

#[macro_use]
pub mod ast;
pub mod keywords;
pub mod lexer;
pub mod parser;
