//! Annotation model.
//!
//! Declared types are an explicit tree rather than live runtime types. The tree carries the
//! handful of wrappers the resolver cares about (`Annotated`, `Final`, `InitVar`), type
//! variables for generic specialisation, and deferred (forward-reference) text that is only
//! resolved once a namespace is available.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::annotation::AnnotationArg;
use crate::errors::{ConfigResult, ConfigurationError};

/// Names visible while resolving deferred annotations.
pub type Namespace = HashMap<String, TypeExpr>;

/// Type-variable name to concrete type, applied during generic specialisation.
pub type TypevarsMap = HashMap<String, TypeExpr>;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Any,
    NoneType,
    Named(String),
    TypeVar(String),
    Generic { origin: String, args: Vec<TypeExpr> },
    /// Forward reference kept as source text until evaluated against a namespace.
    Deferred(String),
    Annotated { base: Box<TypeExpr>, extras: Vec<AnnotationArg> },
    /// `Final` marker; bare `Final` has no inner type.
    Final(Option<Box<TypeExpr>>),
    /// Init-only marker from the dataclass convention; bare `InitVar` has no inner type.
    InitVar(Option<Box<TypeExpr>>),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn type_var(name: impl Into<String>) -> Self {
        Self::TypeVar(name.into())
    }

    pub fn deferred(text: impl Into<String>) -> Self {
        Self::Deferred(text.into())
    }

    pub fn generic(origin: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        Self::Generic {
            origin: origin.into(),
            args,
        }
    }

    /// Builds an annotated composite. Nested composites are flattened, inner extras first.
    pub fn annotated(base: TypeExpr, extras: Vec<AnnotationArg>) -> Self {
        match base {
            Self::Annotated {
                base: inner,
                extras: mut inner_extras,
            } => {
                inner_extras.extend(extras);
                Self::Annotated {
                    base: inner,
                    extras: inner_extras,
                }
            }
            base => Self::Annotated {
                base: Box::new(base),
                extras,
            },
        }
    }

    pub fn final_of(inner: TypeExpr) -> Self {
        Self::Final(Some(Box::new(inner)))
    }

    pub fn init_var_of(inner: TypeExpr) -> Self {
        Self::InitVar(Some(Box::new(inner)))
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final(_))
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, Self::Annotated { .. })
    }

    /// Parses annotation text such as `Dict[str, List[int]]` or `Final['Node']`.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            text,
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    /// Replaces every `Named` leaf that appears in `namespace`.
    pub fn resolve_names(&self, namespace: &Namespace) -> TypeExpr {
        match self {
            Self::Named(name) => namespace.get(name).cloned().unwrap_or_else(|| self.clone()),
            _ => self.map_children(|child| child.resolve_names(namespace)),
        }
    }

    /// Evaluates deferred text against `namespace`, leaving anything unresolvable untouched.
    ///
    /// Each deferred node is expanded one level: forward references introduced by the
    /// substitution stay deferred, so self-referential namespace entries terminate. Text
    /// naming anything outside `namespace` and the builtin scalars stays deferred as well.
    pub fn eval_lenient(&self, namespace: Option<&Namespace>) -> TypeExpr {
        match self {
            Self::Deferred(text) => match (namespace, TypeExpr::parse(text)) {
                (Some(ns), Ok(parsed)) if parsed.names_resolve_in(ns) => parsed.resolve_names(ns),
                _ => self.clone(),
            },
            _ => self.map_children(|child| child.eval_lenient(namespace)),
        }
    }

    fn names_resolve_in(&self, namespace: &Namespace) -> bool {
        match self {
            Self::Named(name) => namespace.contains_key(name) || BUILTIN_NAMES.contains(&name.as_str()),
            Self::Generic { args, .. } => args.iter().all(|arg| arg.names_resolve_in(namespace)),
            Self::Annotated { base, .. } => base.names_resolve_in(namespace),
            Self::Final(Some(inner)) | Self::InitVar(Some(inner)) => inner.names_resolve_in(namespace),
            _ => true,
        }
    }

    /// Substitutes type variables found in `typevars_map`.
    pub fn replace_types(&self, typevars_map: &TypevarsMap) -> TypeExpr {
        match self {
            Self::TypeVar(name) => typevars_map.get(name).cloned().unwrap_or_else(|| self.clone()),
            _ => self.map_children(|child| child.replace_types(typevars_map)),
        }
    }

    /// True when any type variable remains in the tree.
    pub fn has_type_vars(&self) -> bool {
        match self {
            Self::TypeVar(_) => true,
            Self::Generic { args, .. } => args.iter().any(TypeExpr::has_type_vars),
            Self::Annotated { base, .. } => base.has_type_vars(),
            Self::Final(Some(inner)) | Self::InitVar(Some(inner)) => inner.has_type_vars(),
            _ => false,
        }
    }

    fn map_children(&self, f: impl Fn(&TypeExpr) -> TypeExpr) -> TypeExpr {
        match self {
            Self::Generic { origin, args } => Self::Generic {
                origin: origin.clone(),
                args: args.iter().map(&f).collect(),
            },
            Self::Annotated { base, extras } => Self::Annotated {
                base: Box::new(f(base)),
                extras: extras.clone(),
            },
            Self::Final(Some(inner)) => Self::Final(Some(Box::new(f(inner)))),
            Self::InitVar(Some(inner)) => Self::InitVar(Some(Box::new(f(inner)))),
            other => other.clone(),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::NoneType => f.write_str("None"),
            Self::Named(name) | Self::TypeVar(name) => f.write_str(name),
            Self::Generic { origin, args } => {
                write!(f, "{origin}[")?;
                write_joined(f, args)?;
                f.write_str("]")
            }
            Self::Deferred(text) => write!(f, "'{text}'"),
            Self::Annotated { base, extras } => {
                write!(f, "Annotated[{base}")?;
                for extra in extras {
                    write!(f, ", {extra}")?;
                }
                f.write_str("]")
            }
            Self::Final(None) => f.write_str("Final"),
            Self::Final(Some(inner)) => write!(f, "Final[{inner}]"),
            Self::InitVar(None) => f.write_str("InitVar"),
            Self::InitVar(Some(inner)) => write!(f, "InitVar[{inner}]"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Names that always resolve, whatever the namespace.
const BUILTIN_NAMES: &[&str] = &[
    "bool", "bytes", "complex", "dict", "float", "frozenset", "int", "list", "object", "set", "str", "tuple", "type",
];

// ═══════════════════════════════════════════════════════════════════════════════
// Annotation text parser
// ═══════════════════════════════════════════════════════════════════════════════

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:(?P<ident>[A-Za-z_][A-Za-z0-9_.]*)|'(?P<single>[^']*)'|"(?P<double>[^"]*)"|(?P<punct>[\[\],]))"#)
        .expect("annotation token pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Quoted(String),
    Open,
    Close,
    Comma,
}

fn tokenize(text: &str) -> ConfigResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while !text[pos..].trim_start().is_empty() {
        let caps = TOKEN.captures(&text[pos..]).ok_or_else(|| ConfigurationError::InvalidAnnotation {
            text: text.to_string(),
            reason: format!("unexpected character at offset {pos}"),
        })?;

        let token = if let Some(ident) = caps.name("ident") {
            Token::Ident(ident.as_str().to_string())
        } else if let Some(quoted) = caps.name("single").or_else(|| caps.name("double")) {
            Token::Quoted(quoted.as_str().to_string())
        } else {
            match caps.name("punct").map(|m| m.as_str()) {
                Some("[") => Token::Open,
                Some("]") => Token::Close,
                _ => Token::Comma,
            }
        };

        tokens.push(token);
        pos += caps[0].len();
    }

    if tokens.is_empty() {
        return Err(ConfigurationError::InvalidAnnotation {
            text: text.to_string(),
            reason: "annotation is empty".to_string(),
        });
    }

    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidAnnotation {
            text: self.text.to_string(),
            reason: reason.into(),
        }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expr(&mut self) -> ConfigResult<TypeExpr> {
        match self.next() {
            Some(Token::Ident(name)) => {
                let args = if self.peek() == Some(&Token::Open) {
                    self.pos += 1;
                    Some(self.args()?)
                } else {
                    None
                };
                self.build(name, args)
            }
            Some(Token::Quoted(text)) => Ok(TypeExpr::Deferred(text)),
            Some(token) => Err(self.error(format!("unexpected token {token:?}"))),
            None => Err(self.error("unexpected end of annotation")),
        }
    }

    fn args(&mut self) -> ConfigResult<Vec<TypeExpr>> {
        let mut args = Vec::new();
        loop {
            if self.peek() == Some(&Token::Close) && !args.is_empty() {
                self.pos += 1;
                return Ok(args);
            }
            args.push(self.expr()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close) => return Ok(args),
                _ => return Err(self.error("expected `,` or `]`")),
            }
        }
    }

    fn build(&self, name: String, args: Option<Vec<TypeExpr>>) -> ConfigResult<TypeExpr> {
        match (name.as_str(), args) {
            ("Any", None) => Ok(TypeExpr::Any),
            ("None", None) => Ok(TypeExpr::NoneType),
            ("Final", None) => Ok(TypeExpr::Final(None)),
            ("InitVar", None) => Ok(TypeExpr::InitVar(None)),
            ("Final", Some(mut args)) if args.len() == 1 => Ok(TypeExpr::final_of(args.remove(0))),
            ("InitVar", Some(mut args)) if args.len() == 1 => Ok(TypeExpr::init_var_of(args.remove(0))),
            ("Final" | "InitVar" | "Any" | "None", Some(_)) => {
                Err(self.error(format!("`{name}` takes exactly one type argument")))
            }
            ("Annotated", _) => Err(self.error("annotated metadata cannot be written as annotation text")),
            (_, None) => Ok(TypeExpr::Named(name)),
            (_, Some(args)) => Ok(TypeExpr::Generic { origin: name, args }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_generics() {
        let parsed = TypeExpr::parse("Dict[str, List[int]]").unwrap();
        assert_eq!(
            parsed,
            TypeExpr::generic(
                "Dict",
                vec![
                    TypeExpr::named("str"),
                    TypeExpr::generic("List", vec![TypeExpr::named("int")])
                ]
            )
        );
        assert_eq!(parsed.to_string(), "Dict[str, List[int]]");
    }

    #[test]
    fn parses_markers_and_forward_refs() {
        assert_eq!(TypeExpr::parse("Final").unwrap(), TypeExpr::Final(None));
        assert_eq!(
            TypeExpr::parse("Final['Node']").unwrap(),
            TypeExpr::final_of(TypeExpr::deferred("Node"))
        );
        assert_eq!(TypeExpr::parse("InitVar").unwrap(), TypeExpr::InitVar(None));
        assert_eq!(TypeExpr::parse(" Any ").unwrap(), TypeExpr::Any);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(TypeExpr::parse("").is_err());
        assert!(TypeExpr::parse("List[").is_err());
        assert!(TypeExpr::parse("List[]").is_err());
        assert!(TypeExpr::parse("int str").is_err());
        assert!(TypeExpr::parse("Final[int, str]").is_err());
        assert!(TypeExpr::parse("Annotated[int]").is_err());
        let err = TypeExpr::parse("int?").unwrap_err();
        assert_eq!(err.code(), "invalid-annotation");
    }

    #[test]
    fn eval_lenient_resolves_known_names_only() {
        let mut ns = Namespace::new();
        ns.insert("UserId".to_string(), TypeExpr::named("int"));

        let deferred = TypeExpr::generic("List", vec![TypeExpr::deferred("UserId")]);
        assert_eq!(
            deferred.eval_lenient(Some(&ns)),
            TypeExpr::generic("List", vec![TypeExpr::named("int")])
        );

        let unknown = TypeExpr::deferred("Mystery");
        assert_eq!(unknown.eval_lenient(Some(&ns)), unknown);
        assert_eq!(unknown.eval_lenient(None), unknown);

        let partly_known = TypeExpr::deferred("Dict[UserId, Mystery]");
        assert_eq!(partly_known.eval_lenient(Some(&ns)), partly_known);
        assert_eq!(
            TypeExpr::deferred("List[int]").eval_lenient(Some(&Namespace::new())),
            TypeExpr::generic("List", vec![TypeExpr::named("int")])
        );

        let broken = TypeExpr::deferred("List[");
        assert_eq!(broken.eval_lenient(Some(&ns)), broken);
    }

    #[test]
    fn unresolved_reference_resolves_against_a_later_namespace() {
        let mut early = Namespace::new();
        early.insert("Other".to_string(), TypeExpr::named("int"));
        let mut late = Namespace::new();
        late.insert("Later".to_string(), TypeExpr::named("str"));

        let first = TypeExpr::deferred("Later").eval_lenient(Some(&early));
        assert_eq!(first, TypeExpr::deferred("Later"));
        assert_eq!(first.eval_lenient(Some(&late)), TypeExpr::named("str"));
    }

    #[test]
    fn self_referential_namespace_expands_one_level() {
        let mut ns = Namespace::new();
        ns.insert("Node".to_string(), TypeExpr::parse("List['Node']").unwrap());

        let once = TypeExpr::deferred("Node").eval_lenient(Some(&ns));
        assert_eq!(once.to_string(), "List['Node']");
        assert_eq!(once.eval_lenient(Some(&ns)).to_string(), "List[List['Node']]");
    }

    #[test]
    fn replace_types_recurses_through_wrappers() {
        let mut map = TypevarsMap::new();
        map.insert("T".to_string(), TypeExpr::named("int"));

        let expr = TypeExpr::final_of(TypeExpr::generic("List", vec![TypeExpr::type_var("T")]));
        assert!(expr.has_type_vars());
        let replaced = expr.replace_types(&map);
        assert_eq!(replaced.to_string(), "Final[List[int]]");
        assert!(!replaced.has_type_vars());
    }

    #[test]
    fn annotated_flattens_nested_composites() {
        use crate::constraints::{Bound, Metadata};

        let inner = TypeExpr::annotated(
            TypeExpr::named("int"),
            vec![AnnotationArg::Metadata(Metadata::Gt(Bound::Int(1)))],
        );
        let outer = TypeExpr::annotated(inner, vec![AnnotationArg::Metadata(Metadata::Lt(Bound::Int(9)))]);
        match outer {
            TypeExpr::Annotated { base, extras } => {
                assert_eq!(*base, TypeExpr::named("int"));
                assert_eq!(extras.len(), 2);
            }
            other => panic!("expected annotated, got {other:?}"),
        }
    }
}
