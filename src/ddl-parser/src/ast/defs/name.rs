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

use std::fmt;

use crate::ast::display::{self, AstDisplay, AstFormatter};
use crate::keywords;

/// An identifier.
///
/// The contained string is the identifier's value after case folding and
/// unquoting, i.e. what the catalog stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(pub(crate) String);

impl Ident {
    /// Creates a new identifier with the given value. The value is taken
    /// verbatim; no case folding is applied.
    pub fn new<S>(s: S) -> Self
    where
        S: Into<String>,
    {
        Ident(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Reports whether the identifier can be written without quotes and
    /// still lex back to the same value.
    fn can_be_printed_bare(&self) -> bool {
        let mut chars = self.0.chars();
        chars
            .next()
            .map(|ch| matches!(ch, 'a'..='z' | '_'))
            .unwrap_or(false)
            && chars.all(|ch| matches!(ch, 'a'..='z' | '0'..='9' | '_'))
            && !keywords::is_reserved_word(&self.0)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Ident(s.into())
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Ident(s)
    }
}

impl AstDisplay for Ident {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        if !f.stable() && self.can_be_printed_bare() {
            f.write_str(&self.0);
        } else {
            display::write_quoted_ident(f, &self.0);
        }
    }
}
impl_display!(Ident);

/// A possibly schema-qualified name of an item, e.g. `public.stats1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnresolvedItemName(pub Vec<Ident>);

impl UnresolvedItemName {
    /// Creates an item name with no schema qualification.
    pub fn unqualified(name: &str) -> UnresolvedItemName {
        UnresolvedItemName(vec![Ident::new(name)])
    }

    /// Creates a schema-qualified item name.
    pub fn qualified(schema: &str, item: &str) -> UnresolvedItemName {
        UnresolvedItemName(vec![Ident::new(schema), Ident::new(item)])
    }

    /// The schema component, if the name is qualified.
    pub fn schema(&self) -> Option<&Ident> {
        match self.0.as_slice() {
            [schema, _] => Some(schema),
            _ => None,
        }
    }

    /// The unqualified item component.
    pub fn item(&self) -> &Ident {
        self.0.last().expect("item names are never empty")
    }

    pub fn is_qualified(&self) -> bool {
        self.0.len() == 2
    }
}

impl AstDisplay for UnresolvedItemName {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_node(&display::separated(&self.0, "."));
    }
}
impl_display!(UnresolvedItemName);
