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

//! Rendering of AST nodes back into SQL text.
//!
//! [`AstDisplay`] is the deparser: every node knows how to write itself to an
//! [`AstFormatter`]. The output of [`AstDisplay::to_ast_string`] is the
//! canonical text that is shipped to other nodes, so it must always reparse
//! to a structurally equal node.

use std::fmt;

/// Describes the context in which to print an AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// Print with the fewest quotes needed to reparse the AST.
    Simple,
    /// Print so that the output is stable across releases: every identifier
    /// is quoted, even when it would not need to be.
    Stable,
}

/// A formatter that AST nodes write themselves into.
#[derive(Debug)]
pub struct AstFormatter<W> {
    buf: W,
    mode: FormatMode,
}

impl<W> AstFormatter<W>
where
    W: fmt::Write,
{
    pub fn new(buf: W, mode: FormatMode) -> Self {
        AstFormatter { buf, mode }
    }

    pub fn write_node<T: AstDisplay>(&mut self, s: &T) {
        s.fmt(self);
    }

    /// Writes `s` verbatim. Identifiers must go through [`AstFormatter::write_node`]
    /// instead, so that they are quoted when needed.
    pub fn write_str<T: fmt::Display>(&mut self, s: T) {
        write!(self.buf, "{}", s).expect("unexpected error in fmt::Display implementation");
    }

    /// Reports whether every identifier must be quoted.
    pub fn stable(&self) -> bool {
        self.mode == FormatMode::Stable
    }
}

/// Implemented by every AST node that can be rendered back into SQL.
pub trait AstDisplay {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>);

    fn to_ast_string(&self) -> String {
        let mut buf = String::new();
        let mut f = AstFormatter::new(&mut buf, FormatMode::Simple);
        self.fmt(&mut f);
        buf
    }

    fn to_ast_string_stable(&self) -> String {
        let mut buf = String::new();
        let mut f = AstFormatter::new(&mut buf, FormatMode::Stable);
        self.fmt(&mut f);
        buf
    }
}

// Derive a fmt::Display implementation for types implementing AstDisplay.
#[macro_export]
macro_rules! impl_display {
    ($name:ident) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                use $crate::ast::display::AstDisplay;
                f.write_str(&self.to_ast_string())
            }
        }
    };
}

impl<T: AstDisplay> AstDisplay for &T {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        (*self).fmt(f);
    }
}

impl<T: AstDisplay> AstDisplay for Box<T> {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        (**self).fmt(f);
    }
}

pub struct DisplaySeparated<'a, T> {
    slice: &'a [T],
    sep: &'static str,
}

impl<'a, T> AstDisplay for DisplaySeparated<'a, T>
where
    T: AstDisplay,
{
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        let mut delim = "";
        for t in self.slice {
            f.write_str(delim);
            delim = self.sep;
            t.fmt(f);
        }
    }
}

pub fn separated<'a, T>(slice: &'a [T], sep: &'static str) -> DisplaySeparated<'a, T> {
    DisplaySeparated { slice, sep }
}

pub fn comma_separated<T>(slice: &[T]) -> DisplaySeparated<'_, T> {
    DisplaySeparated { slice, sep: ", " }
}

/// Writes `s` as a double-quoted identifier, doubling any embedded quotes.
pub fn write_quoted_ident<W: fmt::Write>(f: &mut AstFormatter<W>, s: &str) {
    f.write_str("\"");
    f.write_str(s.replace('"', "\"\""));
    f.write_str("\"");
}
