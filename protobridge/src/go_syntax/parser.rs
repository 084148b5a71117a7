//! Recursive-descent parser for Go declarations
//!
//! Walks the token stream from [`super::lexer`] and builds a [`SourceFile`]. Function bodies,
//! `var`/`const` initializers and type-parameter lists are skipped by bracket matching, so the
//! parser never has to understand statements or expressions.

use std::path::Path;

use error_stack::Report;

use super::ast::{
    FieldGroup, FieldList, FuncDecl, ImportSpec, InterfaceMethod, InterfaceType, Receiver,
    Signature, SourceFile, StructField, TypeExpr, TypeSpec,
};
use super::lexer::{Token, TokenKind, tokenize};
use crate::error::{Error, Result};

/// Parse a Go source file into its declarations
pub(crate) fn parse_source(path: &Path, source: &str) -> Result<SourceFile> {
    let tokens = tokenize(path, source)?;
    Parser {
        path,
        tokens: &tokens,
        pos: 0,
    }
    .source_file()
}

struct Parser<'a> {
    path:   &'a Path,
    tokens: &'a [Token],
    pos:    usize,
}

/// One parameter list entry before Go's grouping rule is applied
struct ParamEntry {
    name: Option<String>,
    ty:   TypeExpr,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> { self.tokens.get(self.pos) }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> { self.tokens.get(self.pos + offset) }

    fn at_end(&self) -> bool { self.pos >= self.tokens.len() }

    fn is_op(&self, text: &str) -> bool {
        self.peek()
            .is_some_and(|token| token.kind == TokenKind::Operator && token.text == text)
    }

    fn is_word(&self, text: &str) -> bool {
        self.peek()
            .is_some_and(|token| token.kind == TokenKind::Ident && token.text == text)
    }

    fn is_semicolon(&self) -> bool {
        self.peek()
            .is_some_and(|token| token.kind == TokenKind::Semicolon)
    }

    fn is_string(&self) -> bool {
        self.peek().is_some_and(|token| {
            matches!(token.kind, TokenKind::String | TokenKind::RawString)
        })
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(1, |token| token.line)
    }

    fn error(&self, message: impl Into<String>) -> Report<Error> {
        Report::new(Error::parse(self.path, self.line(), message))
    }

    fn unexpected(&self, expected: &str) -> Report<Error> {
        let found = self
            .peek()
            .map_or_else(|| "end of file".to_string(), |token| format!("{:?}", token.text));
        self.error(format!("expected {expected}, found {found}"))
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect_op(&mut self, text: &str) -> Result<()> {
        if self.is_op(text) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{text}'")))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident && !token.is_keyword() => {
                let name = token.text.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// A `;` may be omitted before a closing `)` or `}` and at end of file
    fn expect_semicolon(&mut self) -> Result<()> {
        if self.is_semicolon() {
            self.pos += 1;
            Ok(())
        } else if self.at_end() || self.is_op(")") || self.is_op("}") {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }

    fn skip_semicolons(&mut self) {
        while self.is_semicolon() {
            self.pos += 1;
        }
    }

    /// Skip a bracketed region starting at the current opening token
    fn skip_balanced(&mut self) -> Result<()> {
        let start_line = self.line();
        let mut depth = 0usize;
        while let Some(token) = self.advance() {
            if token.kind != TokenKind::Operator {
                continue;
            }
            match token.text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(Report::new(Error::parse(
            self.path,
            start_line,
            "unbalanced brackets",
        )))
    }

    /// Skip to the end of the current declaration, stepping over nested brackets
    fn skip_to_semicolon(&mut self) -> Result<()> {
        while !self.at_end() && !self.is_semicolon() {
            if self.is_op("(") || self.is_op("[") || self.is_op("{") {
                self.skip_balanced()?;
            } else {
                self.pos += 1;
            }
        }
        Ok(())
    }

    fn source_file(mut self) -> Result<SourceFile> {
        self.skip_semicolons();
        if !self.is_word("package") {
            return Err(self.unexpected("package clause"));
        }
        self.pos += 1;
        let package = self.expect_ident()?;
        self.expect_semicolon()?;

        let mut file = SourceFile {
            path: self.path.to_path_buf(),
            package,
            imports: Vec::new(),
            types: Vec::new(),
            funcs: Vec::new(),
        };

        loop {
            self.skip_semicolons();
            let Some(token) = self.peek() else {
                break;
            };
            match token.text.as_str() {
                "import" if token.kind == TokenKind::Ident => {
                    self.pos += 1;
                    self.grouped(|parser| {
                        let spec = parser.import_spec()?;
                        file.imports.push(spec);
                        Ok(())
                    })?;
                }
                "type" if token.kind == TokenKind::Ident => {
                    self.pos += 1;
                    self.grouped(|parser| {
                        let spec = parser.type_spec()?;
                        file.types.push(spec);
                        Ok(())
                    })?;
                }
                "func" if token.kind == TokenKind::Ident => {
                    let func = self.func_decl()?;
                    file.funcs.push(func);
                }
                "var" | "const" if token.kind == TokenKind::Ident => {
                    self.pos += 1;
                    self.skip_to_semicolon()?;
                }
                _ => return Err(self.unexpected("declaration")),
            }
            self.expect_semicolon()?;
        }

        Ok(file)
    }

    /// Run `spec` once, or once per entry of a parenthesized group
    fn grouped(&mut self, mut spec: impl FnMut(&mut Self) -> Result<()>) -> Result<()> {
        if !self.is_op("(") {
            return spec(self);
        }
        self.pos += 1;
        loop {
            self.skip_semicolons();
            if self.is_op(")") {
                self.pos += 1;
                return Ok(());
            }
            if self.at_end() {
                return Err(self.unexpected("')'"));
            }
            spec(self)?;
            self.expect_semicolon()?;
        }
    }

    fn import_spec(&mut self) -> Result<ImportSpec> {
        let alias = if self.is_op(".") {
            self.pos += 1;
            Some(".".to_string())
        } else if self
            .peek()
            .is_some_and(|token| token.kind == TokenKind::Ident)
        {
            Some(self.expect_ident()?)
        } else {
            None
        };
        if !self.is_string() {
            return Err(self.unexpected("import path"));
        }
        let path = self
            .advance()
            .map(|token| unquote(&token.text))
            .unwrap_or_default();
        Ok(ImportSpec { alias, path })
    }

    fn type_spec(&mut self) -> Result<TypeSpec> {
        let line = self.line();
        let name = self.expect_ident()?;

        let mut generic = false;
        if self.is_op("[") && self.opens_type_parameters() {
            self.skip_balanced()?;
            generic = true;
        }

        let alias = self.is_op("=");
        if alias {
            self.pos += 1;
        }
        let ty = self.type_expr()?;

        Ok(TypeSpec {
            name,
            line,
            alias,
            generic,
            ty,
        })
    }

    /// Distinguish `type L[T any] ...` from `type A [N]int` at the current `[`
    fn opens_type_parameters(&self) -> bool {
        let Some(first) = self.peek_at(1) else {
            return false;
        };
        if first.kind != TokenKind::Ident {
            return false;
        }
        self.peek_at(2).is_some_and(|second| match second.kind {
            TokenKind::Ident => true,
            TokenKind::Operator => matches!(second.text.as_str(), "," | "~" | "["),
            _ => false,
        })
    }

    fn func_decl(&mut self) -> Result<FuncDecl> {
        let line = self.line();
        self.pos += 1;

        let receiver = if self.is_op("(") {
            let list = self.parameters()?;
            Some(self.receiver(&list)?)
        } else {
            None
        };

        let name = self.expect_ident()?;
        let mut generic = false;
        if self.is_op("[") {
            self.skip_balanced()?;
            generic = true;
        }

        let signature = self.signature()?;
        if self.is_op("{") {
            self.skip_balanced()?;
        }

        Ok(FuncDecl {
            name,
            line,
            receiver,
            params: signature.params,
            results: signature.results,
            generic,
        })
    }

    fn receiver(&self, list: &FieldList) -> Result<Receiver> {
        let mut entries = list.entries();
        let (Some((_, ty)), None) = (entries.next(), entries.next()) else {
            return Err(self.error("method receiver must have exactly one entry"));
        };

        let (pointer, base) = match ty {
            TypeExpr::Pointer(inner) => (true, inner.as_ref()),
            other => (false, other),
        };
        let base = match base {
            TypeExpr::Generic { base, .. } => base.as_ref(),
            other => other,
        };
        match base {
            TypeExpr::Name(type_name) => Ok(Receiver {
                type_name: type_name.clone(),
                pointer,
            }),
            other => Err(self.error(format!("invalid receiver type {}", other.display()))),
        }
    }

    fn signature(&mut self) -> Result<Signature> {
        let params = self.parameters()?;
        let results = if self.is_op("(") {
            self.parameters()?
        } else if self.starts_type() {
            FieldList {
                groups: vec![FieldGroup {
                    names: Vec::new(),
                    ty:    self.type_expr()?,
                }],
            }
        } else {
            FieldList::default()
        };
        Ok(Signature { params, results })
    }

    /// Whether the current token can begin a result type
    fn starts_type(&self) -> bool {
        self.peek().is_some_and(|token| match token.kind {
            TokenKind::Ident => {
                !token.is_keyword()
                    || matches!(
                        token.text.as_str(),
                        "func" | "struct" | "interface" | "map" | "chan"
                    )
            }
            TokenKind::Operator => matches!(token.text.as_str(), "*" | "[" | "<-"),
            _ => false,
        })
    }

    fn parameters(&mut self) -> Result<FieldList> {
        self.expect_op("(")?;
        let mut entries = Vec::new();
        while !self.is_op(")") {
            let ty = self.type_expr()?;
            let entry = if self.is_op(",") || self.is_op(")") {
                ParamEntry { name: None, ty }
            } else {
                let TypeExpr::Name(name) = ty else {
                    return Err(self.unexpected("',' or ')'"));
                };
                ParamEntry {
                    name: Some(name),
                    ty:   self.type_expr()?,
                }
            };
            entries.push(entry);
            if self.is_op(",") {
                self.pos += 1;
            } else if !self.is_op(")") {
                return Err(self.unexpected("',' or ')'"));
            }
        }
        self.pos += 1;
        self.group_parameters(entries)
    }

    /// Apply Go's rule: once any entry is `name Type`, bare entries are names sharing the next type
    fn group_parameters(&self, entries: Vec<ParamEntry>) -> Result<FieldList> {
        if entries.iter().all(|entry| entry.name.is_none()) {
            return Ok(FieldList {
                groups: entries
                    .into_iter()
                    .map(|entry| FieldGroup {
                        names: Vec::new(),
                        ty:    entry.ty,
                    })
                    .collect(),
            });
        }

        let mut groups = Vec::new();
        let mut pending = Vec::new();
        for entry in entries {
            match entry.name {
                Some(name) => {
                    pending.push(name);
                    groups.push(FieldGroup {
                        names: std::mem::take(&mut pending),
                        ty:    entry.ty,
                    });
                }
                None => match entry.ty {
                    TypeExpr::Name(name) => pending.push(name),
                    other => {
                        return Err(self.error(format!(
                            "mixed named and unnamed parameters near {}",
                            other.display()
                        )));
                    }
                },
            }
        }
        if !pending.is_empty() {
            return Err(self.error("missing type after parameter names"));
        }
        Ok(FieldList { groups })
    }

    fn type_expr(&mut self) -> Result<TypeExpr> {
        let Some(token) = self.peek() else {
            return Err(self.unexpected("type"));
        };
        match (token.kind, token.text.as_str()) {
            (TokenKind::Ident, "func") => {
                self.pos += 1;
                Ok(TypeExpr::Func(Box::new(self.signature()?)))
            }
            (TokenKind::Ident, "struct") => {
                self.pos += 1;
                self.struct_type()
            }
            (TokenKind::Ident, "interface") => {
                self.pos += 1;
                self.interface_type()
            }
            (TokenKind::Ident, "map") => {
                self.pos += 1;
                self.expect_op("[")?;
                let key = self.type_expr()?;
                self.expect_op("]")?;
                let value = self.type_expr()?;
                Ok(TypeExpr::Map {
                    key:   Box::new(key),
                    value: Box::new(value),
                })
            }
            (TokenKind::Ident, "chan") => {
                self.pos += 1;
                if self.is_op("<-") {
                    self.pos += 1;
                }
                Ok(TypeExpr::Chan(Box::new(self.type_expr()?)))
            }
            (TokenKind::Ident, _) => self.type_name(),
            (TokenKind::Operator, "*") => {
                self.pos += 1;
                Ok(TypeExpr::Pointer(Box::new(self.type_expr()?)))
            }
            (TokenKind::Operator, "<-") => {
                self.pos += 1;
                if !self.is_word("chan") {
                    return Err(self.unexpected("'chan'"));
                }
                self.pos += 1;
                Ok(TypeExpr::Chan(Box::new(self.type_expr()?)))
            }
            (TokenKind::Operator, "...") => {
                self.pos += 1;
                Ok(TypeExpr::Variadic(Box::new(self.type_expr()?)))
            }
            (TokenKind::Operator, "(") => {
                self.pos += 1;
                let inner = self.type_expr()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            (TokenKind::Operator, "[") => self.array_or_slice(),
            _ => Err(self.unexpected("type")),
        }
    }

    fn type_name(&mut self) -> Result<TypeExpr> {
        let first = self.expect_ident()?;
        let base = if self.is_op(".")
            && self
                .peek_at(1)
                .is_some_and(|token| token.kind == TokenKind::Ident)
        {
            self.pos += 1;
            TypeExpr::Qualified {
                package: first,
                name:    self.expect_ident()?,
            }
        } else {
            TypeExpr::Name(first)
        };

        if !self.is_op("[") || !self.opens_instantiation() {
            return Ok(base);
        }
        self.pos += 1;
        let mut args = Vec::new();
        while !self.is_op("]") {
            args.push(self.type_expr()?);
            if self.is_op(",") {
                self.pos += 1;
            } else if !self.is_op("]") {
                return Err(self.unexpected("',' or ']'"));
            }
        }
        self.pos += 1;
        Ok(TypeExpr::Generic {
            base: Box::new(base),
            args,
        })
    }

    /// Whether the `[` after a type name is `Name[Args]` rather than a parameter name followed by
    /// an array or slice type
    fn opens_instantiation(&self) -> bool {
        if self.peek_at(1).is_some_and(|token| token.text == "]") {
            return false;
        }
        let mut depth = 0usize;
        let mut offset = 0;
        while let Some(token) = self.peek_at(offset) {
            if token.kind == TokenKind::Operator {
                match token.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            offset += 1;
        }
        self.peek_at(offset + 1).is_none_or(|after| match after.kind {
            TokenKind::Ident => false,
            TokenKind::Operator => !matches!(after.text.as_str(), "*" | "[" | "<-"),
            _ => true,
        })
    }

    fn array_or_slice(&mut self) -> Result<TypeExpr> {
        self.pos += 1;
        if self.is_op("]") {
            self.pos += 1;
            return Ok(TypeExpr::Slice(Box::new(self.type_expr()?)));
        }

        let mut len = String::new();
        let mut depth = 0usize;
        loop {
            let Some(token) = self.advance() else {
                return Err(self.unexpected("']'"));
            };
            if token.kind == TokenKind::Operator {
                match token.text.as_str() {
                    "(" | "[" => depth += 1,
                    ")" => depth = depth.saturating_sub(1),
                    "]" if depth == 0 => break,
                    "]" => depth -= 1,
                    _ => {}
                }
            }
            len.push_str(&token.text);
        }

        Ok(TypeExpr::Array {
            len,
            element: Box::new(self.type_expr()?),
        })
    }

    fn struct_type(&mut self) -> Result<TypeExpr> {
        self.expect_op("{")?;
        let mut fields = Vec::new();
        loop {
            self.skip_semicolons();
            if self.is_op("}") {
                self.pos += 1;
                return Ok(TypeExpr::Struct(fields));
            }
            if self.at_end() {
                return Err(self.unexpected("'}'"));
            }

            if self.is_embedded_field() {
                let ty = self.type_expr()?;
                let tag = self.field_tag();
                fields.push(StructField {
                    name: None,
                    ty,
                    tag,
                });
            } else {
                let mut names = vec![self.expect_ident()?];
                while self.is_op(",") {
                    self.pos += 1;
                    names.push(self.expect_ident()?);
                }
                let ty = self.type_expr()?;
                let tag = self.field_tag();
                fields.extend(names.into_iter().map(|name| StructField {
                    name: Some(name),
                    ty:   ty.clone(),
                    tag:  tag.clone(),
                }));
            }
            self.expect_semicolon()?;
        }
    }

    /// `T`, `*T`, `pkg.T` and `*pkg.T` with nothing but a tag after them
    fn is_embedded_field(&self) -> bool {
        if self.is_op("*") {
            return true;
        }
        match self.peek_at(1) {
            None => true,
            Some(next) => match next.kind {
                TokenKind::Semicolon | TokenKind::String | TokenKind::RawString => true,
                TokenKind::Operator => matches!(next.text.as_str(), "." | "}"),
                _ => false,
            },
        }
    }

    fn field_tag(&mut self) -> Option<String> {
        if self.is_string() {
            self.advance().map(|token| unquote(&token.text))
        } else {
            None
        }
    }

    fn interface_type(&mut self) -> Result<TypeExpr> {
        self.expect_op("{")?;
        let mut interface = InterfaceType::default();
        loop {
            self.skip_semicolons();
            if self.is_op("}") {
                self.pos += 1;
                return Ok(TypeExpr::Interface(interface));
            }
            if self.at_end() {
                return Err(self.unexpected("'}'"));
            }

            let is_method = self
                .peek()
                .is_some_and(|token| token.kind == TokenKind::Ident && !token.is_keyword())
                && self
                    .peek_at(1)
                    .is_some_and(|token| token.kind == TokenKind::Operator && token.text == "(");
            if is_method {
                let name = self.expect_ident()?;
                let signature = self.signature()?;
                interface.methods.push(InterfaceMethod { name, signature });
            } else {
                let mut terms = Vec::new();
                loop {
                    if self.is_op("~") {
                        self.pos += 1;
                        interface.constraint = true;
                    }
                    terms.push(self.type_expr()?);
                    if !self.is_op("|") {
                        break;
                    }
                    self.pos += 1;
                    interface.constraint = true;
                }
                if terms.len() == 1 {
                    interface.embeds.extend(terms);
                }
            }
            self.expect_semicolon()?;
        }
    }
}

/// Strip the quotes from a string literal token
fn unquote(text: &str) -> String {
    if text.len() >= 2 && (text.starts_with('"') || text.starts_with('`')) {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, reason = "tests")]
mod tests {
    use super::*;

    fn parse(source: &str) -> SourceFile { parse_source(Path::new("test.go"), source).unwrap() }

    const SERVICE: &str = r#"// Package account holds the account service.
package account

import (
	"context"
	"time"

	dep "example.org/dep"
	_ "embed"
)

const limit = 10

var registry = map[string]func(){
	"a": func() {},
}

type (
	Status int32

	Profile struct {
		Name, Email string `json:"name"`
		Tags        []string
		Owner       *dep.Widget
		Scores      map[string]float64
		Seen        time.Time
		callback    func(int) error
		Blob        [16]byte
		dep.Base
		*Audit
	}
)

type Account struct{}

type List[T any] struct {
	Items []T
}

type Errorish interface {
	error
	Code() int
}

// Login authenticates a user.
func (a *Account) Login(ctx context.Context, name, password string) (token string, err error) {
	if name == "" {
		return "", nil
	}
	return "t", nil
}

func (Account) Ping(int, string) error { return nil }

func (a *Account) Tags(prefix string, values ...int) []string {
	return nil
}

func helper() {}
"#;

    #[test]
    fn test_package_and_imports() {
        let file = parse(SERVICE);
        assert_eq!(file.package, "account");
        let imports: Vec<(Option<&str>, &str)> = file
            .imports
            .iter()
            .map(|import| (import.alias.as_deref(), import.path.as_str()))
            .collect();
        assert_eq!(
            imports,
            vec![
                (None, "context"),
                (None, "time"),
                (Some("dep"), "example.org/dep"),
                (Some("_"), "embed"),
            ]
        );
    }

    #[test]
    fn test_grouped_struct_fields() {
        let file = parse(SERVICE);
        let profile = file.type_spec("Profile").unwrap();
        let TypeExpr::Struct(fields) = &profile.ty else {
            panic!("Profile should be a struct");
        };
        let names: Vec<Option<&str>> = fields.iter().map(|field| field.name.as_deref()).collect();
        assert_eq!(
            names,
            vec![
                Some("Name"),
                Some("Email"),
                Some("Tags"),
                Some("Owner"),
                Some("Scores"),
                Some("Seen"),
                Some("callback"),
                Some("Blob"),
                None,
                None,
            ]
        );
        assert_eq!(fields[0].tag.as_deref(), Some("json:\"name\""));
        assert_eq!(fields[3].ty.display(), "*dep.Widget");
        assert_eq!(fields[7].ty.display(), "[16]byte");
        assert_eq!(fields[8].ty.display(), "dep.Base");
        assert_eq!(fields[9].ty.display(), "*Audit");
        assert!(matches!(fields[6].ty, TypeExpr::Func(_)));
    }

    #[test]
    fn test_generic_and_interface_types() {
        let file = parse(SERVICE);
        assert!(file.type_spec("List").unwrap().generic);
        assert!(!file.type_spec("Status").unwrap().generic);

        let TypeExpr::Interface(errorish) = &file.type_spec("Errorish").unwrap().ty else {
            panic!("Errorish should be an interface");
        };
        assert!(errorish.declares_error());
        assert_eq!(errorish.methods.len(), 1);
    }

    #[test]
    fn test_method_signatures() {
        let file = parse(SERVICE);
        let login = file.funcs.iter().find(|func| func.name == "Login").unwrap();
        assert_eq!(login.line, 46);
        let receiver = login.receiver.as_ref().unwrap();
        assert_eq!(receiver.type_name, "Account");
        assert!(receiver.pointer);
        assert_eq!(login.params.len(), 3);
        assert_eq!(login.params.name_at(1), Some(Some("name")));
        assert_eq!(login.params.name_at(2), Some(Some("password")));
        assert_eq!(login.results.name_at(0), Some(Some("token")));

        let ping = file.funcs.iter().find(|func| func.name == "Ping").unwrap();
        assert!(!ping.receiver.as_ref().unwrap().pointer);
        assert_eq!(ping.params.len(), 2);
        assert_eq!(ping.params.name_at(0), Some(None));
        assert_eq!(ping.results.len(), 1);

        let tags = file.funcs.iter().find(|func| func.name == "Tags").unwrap();
        let (_, last) = tags.params.entries().last().unwrap();
        assert_eq!(last.display(), "...int");
        assert!(tags.params.is_variadic());
        assert!(!login.params.is_variadic());
        assert_eq!(tags.results.entries().next().unwrap().1.display(), "[]string");

        assert!(file.func_at_line(login.line).is_some());
        assert!(file.funcs.iter().any(|func| func.name == "helper" && func.receiver.is_none()));
    }

    #[test]
    fn test_missing_package_clause() {
        let error = parse_source(Path::new("x.go"), "type A int\n").unwrap_err();
        assert!(error.current_context().to_string().contains("package clause"));
    }

    #[test]
    fn test_array_length_expression() {
        let file = parse("package p\ntype Key [size * 2]byte\n");
        let spec = file.type_spec("Key").unwrap();
        assert!(!spec.generic);
        assert_eq!(spec.ty.display(), "[size*2]byte");
    }
}
