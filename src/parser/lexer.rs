// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.
//! Tokenizer.
//!
//! A message is split on whitespace into [`Lexeme`]s. Each lexeme carries the
//! tokens it is made of: `2ta` is `NUMBER QTY`, `100min-0` is
//! `NUMBER THOUSAND HYPHEN NUMBER`, `Tort` is a single `WORD`. Space-grouped
//! numbers such as `140 000` are joined into one lexeme.
//!
//! Tokens come from a [`logos`] lexer run over each lexeme. A lexeme without
//! digits is a single token: a marker if the whole word is one (`tel:`,
//! `Ming`), a word otherwise (`Hot-dog`).

use crate::money::literal_value;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[\s.,:;!?+()/]+")]
pub(crate) enum Token<'a> {
    /// Digit literal with optional `.`/`,` groups: `140000`, `140.000`, `1.5`.
    #[regex(r"[0-9]+([.,][0-9]+)*", |lex| literal_value(lex.slice()))]
    Number(u64),

    #[token("ming", ignore(ascii_case))]
    #[token("min", ignore(ascii_case))]
    Thousand,

    /// Quantity marker; the text is kept in case it turns out to be part of a name.
    #[token("ta", |lex| lex.slice(), ignore(ascii_case))]
    #[token("dona", |lex| lex.slice(), ignore(ascii_case))]
    #[token("x", |lex| lex.slice(), ignore(ascii_case))]
    Qty(&'a str),

    #[token("tel", ignore(ascii_case))]
    #[token("telefon", ignore(ascii_case))]
    Tel,

    #[token("-")]
    Hyphen,

    #[regex(r"[^\s0-9\-.,:;!?+()/]+", |lex| lex.slice(), priority = 1)]
    Word(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Lexeme<'a> {
    pub text: &'a str,
    pub tokens: Vec<Token<'a>>,
    /// ASCII digits in the lexeme.
    pub digits: usize,
    spaced: bool,
}

impl<'a> Lexeme<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: lex_word(text),
            digits: text.bytes().filter(u8::is_ascii_digit).count(),
            spaced: false,
        }
    }

    pub fn is_tel_marker(&self) -> bool {
        matches!(self.tokens.as_slice(), [Token::Tel])
    }

    /// Phone number glued to its marker: `tel903456677`, `tel:+998903456677`.
    pub fn attached_phone(&self) -> Option<&'a str> {
        match self.tokens.as_slice() {
            [Token::Tel, Token::Number(_)] => Some(
                self.text
                    .trim_start_matches(|c: char| c.is_alphabetic() || c == ':'),
            ),
            _ => None,
        }
    }

    /// True if the lexeme starts with a thousand marker (`ming`, `ming-0`).
    pub fn is_thousand_marker(&self) -> bool {
        matches!(self.tokens.first(), Some(Token::Thousand))
    }

    pub fn is_qty_marker(&self) -> bool {
        matches!(self.tokens.as_slice(), [Token::Qty(_)])
    }

    pub fn is_hyphen(&self) -> bool {
        matches!(self.tokens.as_slice(), [Token::Hyphen])
    }

    /// Whether this lexeme closes a segment when items are not comma separated.
    ///
    /// Four or more digits, a number with an attached thousand marker, or a
    /// short number followed by a standalone thousand marker.
    pub fn looks_like_money(&self, next: Option<&Lexeme<'_>>) -> bool {
        if self.digits >= 4 {
            return true;
        }
        if self.digits == 0 {
            return false;
        }
        if self
            .tokens
            .windows(2)
            .any(|pair| matches!(pair, [Token::Number(_), Token::Thousand]))
        {
            return true;
        }
        next.is_some_and(Lexeme::is_thousand_marker)
    }

    /// Plain digits and nothing else: `0`, `500`.
    pub fn is_bare_number(&self) -> bool {
        matches!(self.tokens.as_slice(), [Token::Number(_)])
            && self.text.bytes().all(|b| b.is_ascii_digit())
    }

    /// `140` followed by `000`, or an already joined number followed by another group.
    fn accepts_group(&self, next: &Lexeme<'_>) -> bool {
        self.is_bare_number()
            && (self.spaced || self.digits <= 3)
            && next.text.len() == 3
            && next.is_bare_number()
    }

    fn join_group(&mut self, next: &Lexeme<'_>) {
        if let ([Token::Number(value)], [Token::Number(group)]) =
            (self.tokens.as_mut_slice(), next.tokens.as_slice())
        {
            *value = value.saturating_mul(1000).saturating_add(*group);
            self.digits += next.digits;
            self.spaced = true;
        }
    }
}

/// Splits `text` on whitespace and lexes every word.
pub(crate) fn lex(text: &str) -> Vec<Lexeme<'_>> {
    let mut lexemes: Vec<Lexeme<'_>> = Vec::new();
    for word in text.split_whitespace() {
        let lexeme = Lexeme::new(word);
        if let Some(prev) = lexemes.last_mut() {
            if prev.accepts_group(&lexeme) {
                prev.join_group(&lexeme);
                continue;
            }
        }
        lexemes.push(lexeme);
    }
    lexemes
}

/// Tokens of a single whitespace-free word. Characters the lexer does not
/// know are skipped.
pub(crate) fn lex_word(word: &str) -> Vec<Token<'_>> {
    if !word.bytes().any(|b| b.is_ascii_digit()) {
        return vec![classify(word)];
    }
    Token::lexer(word).filter_map(Result::ok).collect()
}

fn classify(word: &str) -> Token<'_> {
    let bare = word.trim_end_matches(':');
    let mut lexer = Token::lexer(bare);
    let whole = match lexer.next() {
        Some(Ok(token)) if lexer.span() == (0..bare.len()) => Some(token),
        _ => None,
    };
    match whole {
        Some(Token::Qty(_)) => Token::Qty(word),
        Some(marker @ (Token::Tel | Token::Thousand | Token::Hyphen)) => marker,
        _ => Token::Word(word),
    }
}
