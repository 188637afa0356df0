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

//! SQL keywords.
//!
//! Only the words the DDL grammar needs are keywords. Reserved keywords can
//! never be used as bare identifiers; every other keyword is accepted
//! wherever an identifier is expected and lowercased like any other word.

use std::fmt;
use std::str::FromStr;

macro_rules! keywords {
    ($($reserved:literal $variant:ident => $text:literal,)*) => {
        /// A SQL keyword.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }

            /// Reports whether the keyword may not appear as a bare
            /// identifier.
            pub fn is_reserved(&self) -> bool {
                match self {
                    $(Keyword::$variant => $reserved,)*
                }
            }
        }

        impl FromStr for Keyword {
            type Err = ();

            fn from_str(s: &str) -> Result<Keyword, ()> {
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok(Keyword::$variant);
                    }
                )*
                Err(())
            }
        }
    };
}

keywords! {
    true Alter => "ALTER",
    true Authorization => "AUTHORIZATION",
    true Cascade => "CASCADE",
    true Create => "CREATE",
    true Drop => "DROP",
    false Exists => "EXISTS",
    true From => "FROM",
    true If => "IF",
    true Not => "NOT",
    true On => "ON",
    false Owner => "OWNER",
    false Rename => "RENAME",
    true Restrict => "RESTRICT",
    false Schema => "SCHEMA",
    true Set => "SET",
    false Statistics => "STATISTICS",
    true To => "TO",
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reports whether `s`, written without quotes, would lex as a reserved
/// keyword.
pub fn is_reserved_word(s: &str) -> bool {
    s.parse::<Keyword>().map(|kw| kw.is_reserved()).unwrap_or(false)
}
