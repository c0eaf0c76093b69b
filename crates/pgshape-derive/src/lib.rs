//! Derive macro for pgshape model declarations.
//!
//! This crate provides `#[derive(Model)]`, which turns a struct into a
//! `pgshape_core::Model` by generating the equivalent `ModelDef` builder
//! calls.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitBool, LitInt, LitStr, parse_macro_input};

/// Derives `pgshape_core::Model` for a struct with named fields.
///
/// # Struct Attributes
///
/// - `#[model(name = "TypeName")]` - Type name used in query templates
///   (optional, defaults to the struct name)
/// - `#[model(table = "table_name")]` - Storage name (optional, defaults to
///   snake_case of the type name)
/// - `#[model(view = "SELECT ...")]` - Declares a view over a query template
/// - `#[model(materialized)]` - Makes the view materialized
///
/// # Field Attributes
///
/// - `#[field(name = "AppXID")]` - Declared name used in query templates
///   (optional, defaults to the PascalCase field name with `id` words
///   spelled `ID`, so `account_id` becomes `AccountID`)
/// - `#[field(db = "column")]` - Column name; `"-"` keeps the field out of
///   storage
/// - `#[field(skip)]` - Not stored
/// - `#[field(key = "a,b")]`, `#[field(unikey = "...")]`,
///   `#[field(ginkey = "...")]` - Plain, unique and GIN index specs,
///   comma-separated, each `name [flags...]`
/// - `#[field(len = 20)]`, `#[field(prec = 4)]` - Length and precision
/// - `#[field(sql = "TEXT")]` - Raw SQL type
/// - `#[field(default = "now()")]` - Raw SQL default
/// - `#[field(nullable)]`, `#[field(nullable = false)]` - Nullability override
/// - `#[field(pk)]`, `#[field(pk = false)]` - Primary-key override
/// - `#[field(fulltext)]` - Enables full-text search
/// - `#[field(json = "name")]`, `#[field(json_skip)]`, `#[field(omit_empty)]`
///   - JSON naming
/// - `#[field(no_upsert)]` - Left out of upsert statements
/// - `#[field(embed)]` - Splices in the fields of a nested model
#[proc_macro_derive(Model, attributes(model, field))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_model_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_model_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let model = parse_model_attrs(&input.attrs, struct_name)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Model derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Model derive only supports structs",
            ));
        }
    };

    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let attrs = parse_field_attrs(&field.attrs)?;

        if attrs.embed {
            parts.push(quote! {
                .embed(<#ty as ::pgshape_core::Model>::model())
            });
            continue;
        }

        let name = attrs.name.clone().unwrap_or_else(|| declared_name(ident));
        let calls = attrs.builder_calls();
        parts.push(quote! {
            .field(::pgshape_core::Field::of::<#ty>(#name) #(#calls)*)
        });
    }

    let type_name = &model.name;
    let table = model.table.as_ref().map(|t| quote!(.table(#t)));
    let view = model.view.as_ref().map(|v| quote!(.view(#v)));
    let materialized = model.materialized.then(|| quote!(.materialized()));

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::pgshape_core::Model for #struct_name #ty_generics #where_clause {
            fn model() -> ::pgshape_core::ModelDef {
                ::pgshape_core::ModelDef::new(#type_name)
                    #table
                    #(#parts)*
                    #view
                    #materialized
            }
        }
    })
}

struct ModelAttrs {
    name: String,
    table: Option<String>,
    view: Option<String>,
    materialized: bool,
}

#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    db: Option<String>,
    skip: bool,
    keys: Vec<String>,
    unikeys: Vec<String>,
    ginkeys: Vec<String>,
    len: Option<u32>,
    prec: Option<u32>,
    sql: Option<String>,
    default: Option<String>,
    nullable: Option<bool>,
    pk: Option<bool>,
    fulltext: bool,
    json: Option<String>,
    json_skip: bool,
    omit_empty: bool,
    no_upsert: bool,
    embed: bool,
}

impl FieldAttrs {
    fn builder_calls(&self) -> Vec<TokenStream2> {
        let mut calls = Vec::new();
        if let Some(db) = &self.db {
            calls.push(quote!(.db_name(#db)));
        }
        if self.skip {
            calls.push(quote!(.skip()));
        }
        calls.extend(self.keys.iter().map(|k| quote!(.index(#k))));
        calls.extend(self.unikeys.iter().map(|k| quote!(.unique_index(#k))));
        calls.extend(self.ginkeys.iter().map(|k| quote!(.gin_index(#k))));
        if let Some(len) = self.len {
            calls.push(quote!(.len(#len)));
        }
        if let Some(prec) = self.prec {
            calls.push(quote!(.prec(#prec)));
        }
        if let Some(sql) = &self.sql {
            calls.push(quote!(.sql_type(#sql)));
        }
        if let Some(default) = &self.default {
            calls.push(quote!(.default_value(#default)));
        }
        if let Some(nullable) = self.nullable {
            calls.push(quote!(.nullable(#nullable)));
        }
        if let Some(pk) = self.pk {
            calls.push(quote!(.primary_key(#pk)));
        }
        if self.fulltext {
            calls.push(quote!(.full_text()));
        }
        if let Some(json) = &self.json {
            calls.push(quote!(.json_name(#json)));
        }
        if self.json_skip {
            calls.push(quote!(.json_skip()));
        }
        if self.omit_empty {
            calls.push(quote!(.omit_empty()));
        }
        if self.no_upsert {
            calls.push(quote!(.skip_upsert()));
        }
        calls
    }
}

fn string_value(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    let value: LitStr = meta.value()?.parse()?;
    Ok(value.value())
}

fn u32_value(meta: &ParseNestedMeta<'_>) -> syn::Result<u32> {
    let value: LitInt = meta.value()?.parse()?;
    value.base10_parse()
}

/// Reads `flag` or `flag = bool`.
fn flag_value(meta: &ParseNestedMeta<'_>) -> syn::Result<bool> {
    if meta.input.peek(syn::Token![=]) {
        let value: LitBool = meta.value()?.parse()?;
        Ok(value.value)
    } else {
        Ok(true)
    }
}

fn index_specs(meta: &ParseNestedMeta<'_>) -> syn::Result<Vec<String>> {
    Ok(string_value(meta)?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_model_attrs(attrs: &[Attribute], struct_name: &Ident) -> syn::Result<ModelAttrs> {
    let mut result = ModelAttrs {
        name: struct_name.to_string(),
        table: None,
        view: None,
        materialized: false,
    };

    for attr in attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                result.name = string_value(&meta)?;
            } else if meta.path.is_ident("table") {
                result.table = Some(string_value(&meta)?);
            } else if meta.path.is_ident("view") {
                result.view = Some(string_value(&meta)?);
            } else if meta.path.is_ident("materialized") {
                result.materialized = flag_value(&meta)?;
            } else {
                return Err(meta.error("unknown model attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("field")) {
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("name") {
                result.name = Some(string_value(&meta)?);
            } else if path.is_ident("db") {
                result.db = Some(string_value(&meta)?);
            } else if path.is_ident("skip") {
                result.skip = flag_value(&meta)?;
            } else if path.is_ident("key") {
                result.keys.extend(index_specs(&meta)?);
            } else if path.is_ident("unikey") {
                result.unikeys.extend(index_specs(&meta)?);
            } else if path.is_ident("ginkey") {
                result.ginkeys.extend(index_specs(&meta)?);
            } else if path.is_ident("len") {
                result.len = Some(u32_value(&meta)?);
            } else if path.is_ident("prec") {
                result.prec = Some(u32_value(&meta)?);
            } else if path.is_ident("sql") {
                result.sql = Some(string_value(&meta)?);
            } else if path.is_ident("default") {
                result.default = Some(string_value(&meta)?);
            } else if path.is_ident("nullable") {
                result.nullable = Some(flag_value(&meta)?);
            } else if path.is_ident("pk") {
                result.pk = Some(flag_value(&meta)?);
            } else if path.is_ident("fulltext") {
                result.fulltext = flag_value(&meta)?;
            } else if path.is_ident("json") {
                result.json = Some(string_value(&meta)?);
            } else if path.is_ident("json_skip") {
                result.json_skip = flag_value(&meta)?;
            } else if path.is_ident("omit_empty") {
                result.omit_empty = flag_value(&meta)?;
            } else if path.is_ident("no_upsert") {
                result.no_upsert = flag_value(&meta)?;
            } else if path.is_ident("embed") {
                result.embed = flag_value(&meta)?;
            } else {
                return Err(meta.error("unknown field attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

/// `account_id` -> `AccountID`, `created_at` -> `CreatedAt`.
fn declared_name(ident: &Ident) -> String {
    let raw = ident.to_string();
    let raw = raw.strip_prefix("r#").unwrap_or(&raw);
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            if word.eq_ignore_ascii_case("id") {
                return "ID".to_string();
            }
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}
