//! Reader for `go.mod` dependency manifests
//!
//! Understands `module`, `go`, `require` and `replace` (single-line and parenthesized block
//! forms), recognises `// indirect` markers, and skips the directives that do not affect where a
//! dependency's source lives.

use std::path::{Path, PathBuf};

use error_stack::Report;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_while1};
use nom::character::complete::{char, space0};
use nom::combinator::{map, rest};
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};
use tracing::trace;

use crate::error::{Error, Result};

/// File name the locator searches for
pub(crate) const MANIFEST_FILE: &str = "go.mod";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Manifest {
    /// Directory containing the `go.mod`
    pub dir:        PathBuf,
    pub module:     String,
    pub go_version: Option<String>,
    pub requires:   Vec<Requirement>,
    pub replaces:   Vec<Replacement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Requirement {
    pub path:     String,
    pub version:  String,
    pub indirect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Replacement {
    pub path:    String,
    /// Only this version is replaced when present
    pub version: Option<String>,
    pub target:  ReplacementTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplacementTarget {
    /// Relative paths are relative to the manifest directory
    Directory(PathBuf),
    Module { path: String, version: String },
}

impl Manifest {
    pub(crate) fn replacement_for(&self, path: &str, version: &str) -> Option<&ReplacementTarget> {
        self.replaces
            .iter()
            .filter(|replace| replace.path == path)
            .find(|replace| {
                replace
                    .version
                    .as_deref()
                    .is_none_or(|replaced| replaced == version)
            })
            .map(|replace| &replace.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme<'a> {
    Word(&'a str),
    Arrow,
    Open,
    Close,
    Comment(&'a str),
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
        delimited(char('`'), take_till(|c| c == '`'), char('`')),
    ))
    .parse(input)
}

fn bare_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !matches!(c, '"' | '`' | '(' | ')')).parse(input)
}

fn lexeme(input: &str) -> IResult<&str, Lexeme<'_>> {
    preceded(
        space0,
        alt((
            map(preceded(tag("//"), rest), Lexeme::Comment),
            map(tag("=>"), |_| Lexeme::Arrow),
            map(char('('), |_| Lexeme::Open),
            map(char(')'), |_| Lexeme::Close),
            map(quoted, Lexeme::Word),
            map(bare_word, Lexeme::Word),
        )),
    )
    .parse(input)
}

fn lexemes(line: &str) -> Vec<Lexeme<'_>> {
    let mut found = Vec::new();
    let mut input = line;
    while let Ok((remaining, lexeme)) = lexeme(input) {
        found.push(lexeme);
        input = remaining;
    }
    found
}

/// One logical entry: directive words with its trailing comment
struct Entry<'a> {
    words:   Vec<&'a str>,
    arrow:   Option<usize>,
    comment: Option<&'a str>,
    line:    usize,
}

impl Entry<'_> {
    fn indirect(&self) -> bool {
        self.comment.is_some_and(|comment| {
            let comment = comment.trim();
            comment == "indirect" || comment.starts_with("indirect;")
        })
    }
}

struct ManifestParser<'a> {
    path:     &'a Path,
    manifest: Manifest,
}

impl ManifestParser<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> Report<Error> {
        Report::new(Error::parse(self.path, line, message))
    }

    fn directive(&mut self, directive: &str, entry: &Entry<'_>) -> Result<()> {
        match directive {
            "module" => {
                let [module] = entry.words.as_slice() else {
                    return Err(self.error(entry.line, "module directive takes one path"));
                };
                self.manifest.module = (*module).to_string();
            }
            "go" => self.manifest.go_version = entry.words.first().map(ToString::to_string),
            "require" => {
                let [path, version] = entry.words.as_slice() else {
                    return Err(self.error(entry.line, "require entry needs a path and a version"));
                };
                self.manifest.requires.push(Requirement {
                    path:     (*path).to_string(),
                    version:  (*version).to_string(),
                    indirect: entry.indirect(),
                });
            }
            "replace" => {
                let replacement = self.replacement(entry)?;
                self.manifest.replaces.push(replacement);
            }
            other => trace!("Skipping go.mod directive '{other}'"),
        }
        Ok(())
    }

    fn replacement(&self, entry: &Entry<'_>) -> Result<Replacement> {
        let Some(arrow) = entry.arrow else {
            return Err(self.error(entry.line, "replace entry needs '=>'"));
        };
        let (old, new) = entry.words.split_at(arrow);
        let (path, version) = match old {
            [path] => (*path, None),
            [path, version] => (*path, Some((*version).to_string())),
            _ => return Err(self.error(entry.line, "replace entry has a malformed left side")),
        };
        let target = match new {
            [dir] if is_local_path(dir) => ReplacementTarget::Directory(PathBuf::from(dir)),
            [path, version] => ReplacementTarget::Module {
                path:    (*path).to_string(),
                version: (*version).to_string(),
            },
            _ => {
                return Err(self.error(
                    entry.line,
                    "replace target must be a local directory or a module path and version",
                ));
            }
        };
        Ok(Replacement {
            path: path.to_string(),
            version,
            target,
        })
    }
}

/// `./x`, `../x` or an absolute path, as opposed to a module path
fn is_local_path(candidate: &str) -> bool {
    candidate.starts_with("./")
        || candidate.starts_with("../")
        || candidate == "."
        || candidate == ".."
        || Path::new(candidate).is_absolute()
}

/// Parse the text of a `go.mod` located in `dir`
pub(crate) fn parse_manifest(path: &Path, dir: &Path, contents: &str) -> Result<Manifest> {
    let mut parser = ManifestParser {
        path,
        manifest: Manifest {
            dir:        dir.to_path_buf(),
            module:     String::new(),
            go_version: None,
            requires:   Vec::new(),
            replaces:   Vec::new(),
        },
    };

    let mut block: Option<String> = None;
    for (index, line) in contents.lines().enumerate() {
        let line_number = index + 1;
        let mut entry = Entry {
            words:   Vec::new(),
            arrow:   None,
            comment: None,
            line:    line_number,
        };
        let mut opens = false;
        let mut closes = false;
        for lexeme in lexemes(line) {
            match lexeme {
                Lexeme::Word(word) => entry.words.push(word),
                Lexeme::Arrow => entry.arrow = Some(entry.words.len()),
                Lexeme::Open => opens = true,
                Lexeme::Close => closes = true,
                Lexeme::Comment(comment) => entry.comment = Some(comment),
            }
        }

        if let Some(directive) = block.clone() {
            if closes && entry.words.is_empty() {
                block = None;
            } else if !entry.words.is_empty() {
                parser.directive(&directive, &entry)?;
            }
            continue;
        }

        if entry.words.is_empty() {
            continue;
        }
        let directive = entry.words.remove(0).to_string();
        entry.arrow = entry.arrow.map(|arrow| arrow.saturating_sub(1));
        if opens && entry.words.is_empty() {
            block = Some(directive);
        } else {
            parser.directive(&directive, &entry)?;
        }
    }

    if block.is_some() {
        return Err(parser.error(contents.lines().count(), "unterminated directive block"));
    }
    if parser.manifest.module.is_empty() {
        return Err(parser.error(1, "missing module directive"));
    }
    Ok(parser.manifest)
}
