//! Implementation of the `#[derive(Entity)]` macro.
//!
//! Generates the `Entity` impl with a lazily built schema, a `FieldType`
//! impl so the struct can be nested in other entities, and one selector
//! constant per member.

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, Data, DeriveInput, Error, Fields, Result};

use super::attrs::{parse_entity_attrs, parse_member_attrs, RenameRule};

/// Main implementation of the Entity derive macro.
pub fn entity_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Entity can not be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Entity can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Entity can only be derived for structs",
            ))
        }
    };

    let entity_attrs = parse_entity_attrs(&input.attrs)?;
    let type_name = entity_attrs
        .rename
        .unwrap_or_else(|| struct_name.to_string());
    let rule = entity_attrs.rename_all.unwrap_or(RenameRule::SnakeCase);

    let mut members: Vec<TokenStream> = Vec::new();
    let mut value_arms: Vec<TokenStream> = Vec::new();
    let mut member_constants: Vec<TokenStream> = Vec::new();
    let mut seen = HashSet::new();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;

        let member_attrs = parse_member_attrs(&field.attrs)?;
        if member_attrs.skip {
            continue;
        }

        let member_name = member_attrs
            .rename
            .unwrap_or_else(|| rule.apply(&field_name.to_string()));
        if !seen.insert(member_name.clone()) {
            return Err(Error::new(
                field.span(),
                format!("duplicate member name '{}'", member_name),
            ));
        }

        let ty = &field.ty;
        let const_name = member_const_ident(&member_name).ok_or_else(|| {
            Error::new(
                field.span(),
                format!(
                    "member name '{}' is not a valid selector segment; use letters, digits and '_'",
                    member_name
                ),
            )
        })?;

        member_constants.push(quote! {
            /// Selector for this member.
            pub const #const_name: &'static str = #member_name;
        });
        members.push(quote! {
            ::sift::Member::field::<#ty>(#member_name)
        });
        value_arms.push(quote! {
            #member_name => ::sift::FieldType::to_value(&self.#field_name),
        });
    }

    let expanded = quote! {
        impl #struct_name {
            #(#member_constants)*
        }

        impl ::sift::Entity for #struct_name {
            fn schema() -> &'static ::sift::Schema {
                static SCHEMA: ::std::sync::OnceLock<::sift::Schema> = ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    ::sift::Schema::new(#type_name, ::std::vec![#(#members),*])
                })
            }

            fn member_value(&self, member: &str) -> ::sift::Value<'_> {
                match member {
                    #(#value_arms)*
                    _ => ::sift::Value::Null,
                }
            }
        }

        impl ::sift::FieldType for #struct_name {
            fn field_kind() -> ::sift::FieldKind {
                ::sift::FieldKind::Entity(<#struct_name as ::sift::Entity>::schema)
            }

            fn to_value(&self) -> ::sift::Value<'_> {
                ::sift::Value::Entity(self)
            }
        }
    };

    Ok(expanded)
}

/// Constant ident for a member, or `None` if the name can not appear in a
/// selector or as a Rust constant.
fn member_const_ident(member_name: &str) -> Option<syn::Ident> {
    let mut chars = member_name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    syn::parse_str(&to_screaming_snake_case(member_name)).ok()
}

/// Convert a string to SCREAMING_SNAKE_CASE.
fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_was_lower = false;

    for c in s.chars() {
        if c.is_uppercase() {
            if prev_was_lower {
                result.push('_');
            }
            result.push(c);
            prev_was_lower = false;
        } else if c == '_' || c == '-' {
            result.push('_');
            prev_was_lower = false;
        } else {
            result.push(c.to_ascii_uppercase());
            prev_was_lower = true;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screaming_snake_case() {
        assert_eq!(to_screaming_snake_case("name"), "NAME");
        assert_eq!(to_screaming_snake_case("created_at"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("CreatedAt"), "CREATED_AT");
        assert_eq!(to_screaming_snake_case("firstName"), "FIRST_NAME");
    }

    #[test]
    fn rejects_generic_structs() {
        let input: DeriveInput = syn::parse_quote! {
            struct Wrapper<T> { inner: T }
        };
        let err = entity_derive_impl(input).unwrap_err();
        assert!(err.to_string().contains("generic"));
    }

    #[test]
    fn rejects_tuple_structs_and_enums() {
        let tuple: DeriveInput = syn::parse_quote! { struct Pair(u8, u8); };
        assert!(entity_derive_impl(tuple).is_err());

        let enumeration: DeriveInput = syn::parse_quote! { enum State { On, Off } };
        assert!(entity_derive_impl(enumeration).is_err());
    }

    #[test]
    fn rejects_member_names_that_are_not_identifiers() {
        for rename in ["First Name", "2nd", "", "_", "e-mail"] {
            let input: DeriveInput = syn::parse_quote! {
                struct Person {
                    #[sift(rename = #rename)]
                    name: String,
                }
            };
            let err = entity_derive_impl(input).unwrap_err();
            assert!(
                err.to_string().contains("not a valid selector segment"),
                "rename {rename:?}"
            );
        }
    }

    #[test]
    fn rejects_duplicate_members() {
        let input: DeriveInput = syn::parse_quote! {
            struct Person {
                name: String,
                #[sift(rename = "name")]
                nick: String,
            }
        };
        let err = entity_derive_impl(input).unwrap_err();
        assert!(err.to_string().contains("duplicate member name"));
    }

    #[test]
    fn generates_members_for_unskipped_fields() {
        let input: DeriveInput = syn::parse_quote! {
            #[sift(rename_all = "PascalCase")]
            struct Person {
                first_name: String,
                #[sift(skip)]
                secret: String,
            }
        };
        let tokens = entity_derive_impl(input).unwrap().to_string();
        assert!(tokens.contains("\"FirstName\""));
        assert!(tokens.contains("FIRST_NAME"));
        assert!(!tokens.contains("\"Secret\""));
    }
}
