//! Attribute parsing for the Entity derive macro.
//!
//! Parses `#[sift(...)]` on the struct (`rename`, `rename_all`) and on its
//! fields (`skip`, `rename`).

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Expr, ExprLit, Lit, LitStr, Meta, MetaNameValue, Result, Token,
};

/// Casing applied to field names that have no explicit `rename`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    /// `first_name` -> `FirstName`
    PascalCase,
    /// `first_name` -> `firstName`
    CamelCase,
    /// Field names as written.
    SnakeCase,
}

impl RenameRule {
    /// Parses a rule name.
    pub fn from_str(s: &str, span: Span) -> Result<Self> {
        match s {
            "PascalCase" => Ok(RenameRule::PascalCase),
            "camelCase" => Ok(RenameRule::CamelCase),
            "snake_case" => Ok(RenameRule::SnakeCase),
            other => Err(Error::new(
                span,
                format!(
                    "unknown rename rule: '{}'. Expected one of: PascalCase, camelCase, snake_case",
                    other
                ),
            )),
        }
    }

    /// Applies the rule to a snake_case field name.
    pub fn apply(self, field: &str) -> String {
        let field = field.strip_prefix("r#").unwrap_or(field);
        match self {
            RenameRule::SnakeCase => field.to_string(),
            RenameRule::PascalCase => field
                .split('_')
                .filter(|part| !part.is_empty())
                .map(capitalize)
                .collect(),
            RenameRule::CamelCase => {
                let pascal = RenameRule::PascalCase.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Struct-level attributes from `#[sift(...)]`.
#[derive(Debug, Clone, Default)]
pub struct EntityAttr {
    /// Logical type name (default: the struct name).
    pub rename: Option<String>,
    /// Casing for member names.
    pub rename_all: Option<RenameRule>,
}

impl Parse for EntityAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = EntityAttr::default();
        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    attr.rename = Some(string_value(nv, "rename")?.value());
                }
                Meta::NameValue(nv) if nv.path.is_ident("rename_all") => {
                    let s = string_value(nv, "rename_all")?;
                    attr.rename_all = Some(RenameRule::from_str(&s.value(), s.span())?);
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown sift attribute. Expected: rename = \"...\" or rename_all = \"...\"",
                    ));
                }
            }
        }

        Ok(attr)
    }
}

/// Field-level attributes from `#[sift(...)]`.
#[derive(Debug, Clone, Default)]
pub struct MemberAttr {
    /// Leave this field out of the schema.
    pub skip: bool,
    /// Member name used in selectors (default: field name).
    pub rename: Option<String>,
}

impl Parse for MemberAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = MemberAttr::default();
        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("skip") => attr.skip = true,
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    attr.rename = Some(string_value(nv, "rename")?.value());
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown sift attribute. Expected: skip or rename = \"...\"",
                    ));
                }
            }
        }

        Ok(attr)
    }
}

fn string_value<'a>(nv: &'a MetaNameValue, name: &str) -> Result<&'a LitStr> {
    match &nv.value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s),
        other => Err(Error::new(
            other.span(),
            format!("{} must be a string literal", name),
        )),
    }
}

/// Extracts `#[sift(...)]` from a struct's attributes.
pub fn parse_entity_attrs(attrs: &[Attribute]) -> Result<EntityAttr> {
    parse_sift_attr(attrs)
}

/// Extracts `#[sift(...)]` from a field's attributes.
pub fn parse_member_attrs(attrs: &[Attribute]) -> Result<MemberAttr> {
    parse_sift_attr(attrs)
}

fn parse_sift_attr<A: Parse + Default>(attrs: &[Attribute]) -> Result<A> {
    for attr in attrs {
        if attr.path().is_ident("sift") {
            return attr.parse_args::<A>();
        }
    }
    Ok(A::default())
}
