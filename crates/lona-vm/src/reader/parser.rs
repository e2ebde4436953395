// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The S-expression reader: turns tokens into `Value` trees, attaching a
//! source mapping to every pair it allocates (§4.2).

use super::lexer::{Bracket, Lexer, Pos, Token};
use crate::error::{LonaError, Result};
use crate::handle::Handle;
use crate::value::Value;
use crate::value::object::HeapObject;
use crate::vm::Vm;

pub struct Reader<'a, 'vm> {
    lexer: Lexer<'a>,
    vm: &'vm mut Vm,
    file: Handle,
    peeked: Option<(Pos, Token)>,
}

impl<'a, 'vm> Reader<'a, 'vm> {
    #[must_use]
    pub fn new(vm: &'vm mut Vm, file: Handle, src: &'a str) -> Self {
        Self {
            lexer: Lexer::new(src),
            vm,
            file,
            peeked: None,
        }
    }

    fn next(&mut self) -> Result<(Pos, Token)> {
        if let Some(t) = self.peeked.take() {
            return Ok(t);
        }
        self.lexer.next_token()
    }

    fn peek(&mut self) -> Result<&(Pos, Token)> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(self.peeked.as_ref().expect("just filled"))
    }

    /// Read every top-level form in the source.
    ///
    /// # Errors
    /// Returns `Err` on a malformed token stream or unbalanced brackets.
    pub fn read_all(&mut self) -> Result<Vec<Value>> {
        let mut forms = Vec::new();
        loop {
            match self.peek()? {
                (_, Token::Eof) => break,
                _ => forms.push(self.read_form()?),
            }
        }
        Ok(forms)
    }

    /// Read a single form, or `None` at end of input.
    ///
    /// # Errors
    /// Returns `Err` on a malformed token stream.
    pub fn read_one(&mut self) -> Result<Option<Value>> {
        if matches!(self.peek()?, (_, Token::Eof)) {
            return Ok(None);
        }
        self.read_form().map(Some)
    }

    fn read_form(&mut self) -> Result<Value> {
        let (start, token) = self.next()?;
        let value = match token {
            Token::ListOpen(b) => self.read_list(start, b)?,
            Token::ArrayOpen(b) => self.read_array(start, b)?,
            Token::DictOpen(b) => self.read_dict(start, b)?,
            Token::Quote => self.read_wrapped("quote")?,
            Token::Quasiquote => self.read_wrapped("quasiquote")?,
            Token::Unquote => self.read_wrapped("unquote")?,
            Token::UnquoteSplicing => self.read_wrapped("unquote-splicing")?,
            Token::Caret => self.read_caret_lambda(start)?,
            Token::Colon => self.read_consq(start)?,
            Token::Number(n) => Value::Number(n),
            Token::String(s) => self.vm.make_string(s),
            Token::StringPart(prefix) => self.read_interpolated_string(prefix, start)?,
            Token::Buffer(bytes) => self.vm.make_buffer(bytes),
            Token::Symbol(name) => self.read_symbol(&name),
            Token::SymbolColon(name) => self.read_colon_path(name, start)?,
            Token::ListClose(_) => {
                return Err(LonaError::read(
                    "unexpected closing bracket",
                    None,
                    start.line,
                    0,
                ));
            }
            Token::Dot => {
                return Err(LonaError::read(
                    "unexpected '.' outside of a list",
                    None,
                    start.line,
                    0,
                ));
            }
            Token::Eof => return Err(LonaError::read("unexpected end of input", None, start.line, 0)),
        };
        Ok(value)
    }

    fn read_symbol(&mut self, name: &str) -> Value {
        self.vm.intern(name)
    }

    /// `a:b:c` dotted-accessor-path sugar: reads as `(get a (quote b) (quote c))`.
    /// `name` is the first component; the lexer has already consumed its
    /// trailing `:`. Subsequent `SymbolColon` tokens chain further
    /// components until a plain trailing `Symbol` token ends the path.
    fn read_colon_path(&mut self, name: String, start: Pos) -> Result<Value> {
        let mut components = Vec::new();
        loop {
            match self.next()? {
                (_, Token::SymbolColon(component)) => components.push(component),
                (_, Token::Symbol(component)) => {
                    components.push(component);
                    break;
                }
                (pos, _) => {
                    return Err(LonaError::read(
                        "expected a symbol after ':' in an accessor path",
                        None,
                        pos.line,
                        0,
                    ));
                }
            }
        }
        let get_sym = self.vm.intern("get");
        let quote_sym = self.vm.intern("quote");
        let base = self.vm.intern(&name);
        let mut tail = Value::Nil;
        for component in components.into_iter().rev() {
            let component_sym = self.vm.intern(&component);
            let quoted_inner = self.vm.cons(component_sym, Value::Nil);
            let quoted = self.vm.cons(quote_sym, quoted_inner);
            tail = self.vm.cons(quoted, tail);
        }
        let args = self.vm.cons(base, tail);
        let result = self.vm.cons(get_sym, args);
        self.attach_mapping(result, start);
        Ok(result)
    }

    /// A bare leading `:` (not attached to a preceding symbol): reads the
    /// next two forms and produces a 3-element `(consq a b)` form.
    fn read_consq(&mut self, start: Pos) -> Result<Value> {
        let a = self.read_form()?;
        let b = self.read_form()?;
        let sym = self.vm.intern("consq");
        let tail = self.vm.cons(b, Value::Nil);
        let args = self.vm.cons(a, tail);
        let result = self.vm.cons(sym, args);
        self.attach_mapping(result, start);
        Ok(result)
    }

    /// `^` lambda shorthand: reads one following sexp (a formals-and-body
    /// list) and conses the `lambda` symbol onto it directly, rather than
    /// wrapping it in a new 2-element list.
    fn read_caret_lambda(&mut self, start: Pos) -> Result<Value> {
        let inner = self.read_form()?;
        let sym = self.vm.intern("lambda");
        let result = self.vm.cons(sym, inner);
        self.attach_mapping(result, start);
        Ok(result)
    }

    /// Assemble a `\(expr)`-interpolated string literal into
    /// `(concat "lit1" (evalq expr) "lit2" ...)`. Each interpolated form is
    /// wrapped by consing the `evalq` symbol directly onto its parsed list
    /// value (not a 2-element wrap), matching `evalq`'s special-form
    /// contract of evaluating only the first element of its argument list.
    fn read_interpolated_string(&mut self, first_prefix: String, start: Pos) -> Result<Value> {
        let mut pieces = Vec::new();
        let mut prefix = first_prefix;
        loop {
            let literal = self.vm.make_string(prefix);
            pieces.push(literal);

            let form = self.read_form()?;
            let evalq = self.vm.intern("evalq");
            let wrapped = self.vm.cons(evalq, form);
            pieces.push(wrapped);

            match self.lexer.resume_string_part()? {
                Token::String(s) => {
                    let tail = self.vm.make_string(s);
                    pieces.push(tail);
                    break;
                }
                Token::StringPart(next_prefix) => {
                    prefix = next_prefix;
                }
                _ => unreachable!("resume_string_part only ever yields String or StringPart"),
            }
        }
        let concat = self.vm.intern("concat");
        let mut result = Value::Nil;
        for item in pieces.into_iter().rev() {
            result = self.vm.cons(item, result);
        }
        result = self.vm.cons(concat, result);
        self.attach_mapping(result, start);
        Ok(result)
    }

    fn read_wrapped(&mut self, head: &str) -> Result<Value> {
        let start = self.lexer.mark();
        let inner = self.read_form()?;
        let head_sym = self.vm.intern(head);
        let list = self.vm.cons(inner, Value::Nil);
        let wrapped = self.vm.cons(head_sym, list);
        self.attach_mapping(wrapped, start);
        Ok(wrapped)
    }

    fn read_list(&mut self, start: Pos, bracket: Bracket) -> Result<Value> {
        let mut items = Vec::new();
        let mut tail = Value::Nil;
        loop {
            match self.peek()? {
                (_, Token::ListClose(b)) if *b == bracket => {
                    self.next()?;
                    break;
                }
                (pos, Token::ListClose(_)) => {
                    return Err(LonaError::read(
                        "mismatched closing bracket",
                        None,
                        pos.line,
                        0,
                    ));
                }
                (_, Token::Dot) => {
                    self.next()?;
                    tail = self.read_form()?;
                    match self.next()? {
                        (_, Token::ListClose(b)) if b == bracket => break,
                        (pos, _) => {
                            return Err(LonaError::read(
                                "expected the matching closing bracket after dotted tail",
                                None,
                                pos.line,
                                0,
                            ));
                        }
                    }
                }
                (_, Token::Eof) => {
                    return Err(LonaError::read(
                        "unterminated list",
                        None,
                        start.line,
                        0,
                    ));
                }
                _ => items.push(self.read_form()?),
            }
        }
        let mut result = tail;
        for item in items.into_iter().rev() {
            result = self.vm.cons(item, result);
        }
        if let Value::Pair(_) = result {
            self.attach_mapping(result, start);
        }
        Ok(result)
    }

    /// Unlike a plain list, an array literal's closer may be any of the
    /// three bracket families regardless of which one opened it (§9's
    /// resolution of the bracket-matching open question).
    fn read_array(&mut self, start: Pos, _bracket: Bracket) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            match self.peek()? {
                (_, Token::ListClose(_)) => {
                    self.next()?;
                    break;
                }
                (pos, Token::Eof) => {
                    return Err(LonaError::read("unterminated array literal", None, pos.line, 0));
                }
                _ => items.push(self.read_form()?),
            }
        }
        let _ = start;
        Ok(self.vm.make_array(items))
    }

    /// A dict literal's elements must already be symbol-keyed binding pairs
    /// (e.g. `(a . 1)`), matching `mkdict` in the original source: each
    /// parsed element is required to be a `Pair` whose `car` is a `Symbol`.
    /// As with arrays, the closer may be any of the three bracket families.
    fn read_dict(&mut self, start: Pos, _bracket: Bracket) -> Result<Value> {
        let mut entries = Vec::new();
        loop {
            match self.peek()? {
                (_, Token::ListClose(_)) => {
                    self.next()?;
                    break;
                }
                (pos, Token::Eof) => {
                    return Err(LonaError::read(
                        "unterminated dictionary literal",
                        None,
                        pos.line,
                        0,
                    ));
                }
                (pos, _) => {
                    let pos_line = pos.line;
                    let element = self.read_form()?;
                    let Value::Pair(h) = element else {
                        return Err(LonaError::read(
                            "bad dict: must be a symbol binding pair",
                            None,
                            pos_line,
                            0,
                        ));
                    };
                    let (key, value) = {
                        let HeapObject::Pair(p) = self.vm.heap().get(h)? else {
                            unreachable!()
                        };
                        (p.car, p.cdr)
                    };
                    if !matches!(key, Value::Symbol(_)) {
                        return Err(LonaError::read(
                            "bad dict: must be a symbol binding pair",
                            None,
                            pos_line,
                            0,
                        ));
                    }
                    entries.push((key, value));
                }
            }
        }
        let _ = start;
        self.vm.make_dictionary(entries)
    }

    fn attach_mapping(&mut self, pair: Value, start: Pos) {
        let end = self.lexer.mark();
        self.vm.attach_mapping(pair, self.file, start.offset, end.offset, start.line);
    }
}
