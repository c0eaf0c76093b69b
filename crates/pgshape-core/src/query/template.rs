//! Query template resolution.
//!
//! A template mixes plain SQL with symbols naming models and fields:
//!
//! | Symbol               | Resolves to                 |
//! |----------------------|-----------------------------|
//! | `&Model`             | `namespace.table`           |
//! | `&CURRSCHEMA.&Model` | `current_schema.table`      |
//! | `:Model.*`           | `namespace.table.*`         |
//! | `:Field`             | `column`                    |
//! | `:Model.Field`       | `namespace.table.column`    |
//! | `:Model.json.Field`  | `'json_name'`               |
//!
//! Resolution first collects every model the query mentions, merges their
//! [`ReplaceTable`]s and then substitutes segment by segment. Unknown
//! symbols are left as written unless strict mode is requested.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::lexer::Scanner;
use crate::model::ModelDescriptor;

const CURRENT_SCHEMA: &str = "&CURRSCHEMA.";

/// Concrete text a symbol resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceEntry {
    /// Replacement text.
    pub to: String,
    /// Namespace baked into `to`; empty when the text is not qualified.
    pub schema: String,
}

/// All symbols one model offers, bound to one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceTable {
    type_name: String,
    table: String,
    entries: HashMap<String, ReplaceEntry>,
}

impl ReplaceTable {
    /// Builds the symbol table of a model. An empty namespace leaves table
    /// references unqualified.
    #[must_use]
    pub fn for_model(md: &ModelDescriptor, namespace: &str) -> Self {
        let qualified = if namespace.is_empty() {
            md.table().to_string()
        } else {
            format!("{namespace}.{}", md.table())
        };
        let prefix = format!(":{}", md.type_name());

        let mut entries = HashMap::new();
        entries.insert(
            format!("&{}", md.type_name()),
            ReplaceEntry {
                to: qualified.clone(),
                schema: namespace.to_string(),
            },
        );
        entries.insert(
            format!("{prefix}.*"),
            ReplaceEntry {
                to: format!("{qualified}.*"),
                schema: namespace.to_string(),
            },
        );

        let unqualified = |to: String| ReplaceEntry {
            to,
            schema: String::new(),
        };
        for fd in md.stored_fields() {
            entries.insert(format!(":{}", fd.name), unqualified(fd.db_name.clone()));
            entries.insert(
                format!("{prefix}.{}", fd.name),
                unqualified(format!("{qualified}.{}", fd.db_name)),
            );
            entries.insert(
                format!("{prefix}.json.{}", fd.name),
                unqualified(format!("'{}'", fd.json_name)),
            );
        }

        Self {
            type_name: md.type_name().to_string(),
            table: md.table().to_string(),
            entries,
        }
    }

    /// Returns the model's type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the unqualified table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Looks a symbol up.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&ReplaceEntry> {
        self.entries.get(symbol)
    }

    /// Iterates over all `(symbol, entry)` pairs in arbitrary order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ReplaceEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Source of per-model symbol tables, keyed by model type name.
pub trait ReplaceSource {
    /// Returns the symbol table of a model.
    fn replace_table(&self, type_name: &str) -> Option<&ReplaceTable>;
}

impl ReplaceSource for HashMap<String, ReplaceTable> {
    fn replace_table(&self, type_name: &str) -> Option<&ReplaceTable> {
        self.get(type_name)
    }
}

/// Returns the model a symbol refers to, if it names one.
///
/// `&Model`, `&CURRSCHEMA.&Model` and `:Model.<anything>` name a model; a
/// bare `:Field` does not.
fn model_of(symbol: &str) -> Option<&str> {
    let symbol = symbol.strip_prefix(CURRENT_SCHEMA).unwrap_or(symbol);
    if let Some(rest) = symbol.strip_prefix('&') {
        return Some(rest.split('.').next().unwrap_or(rest));
    }
    symbol
        .strip_prefix(':')
        .and_then(|rest| rest.split_once('.'))
        .map(|(model, _)| model)
}

/// Resolves the symbols of a query template.
///
/// `current_schema` is the namespace of the calling context: it qualifies
/// `&CURRSCHEMA.&Model` and unqualified bare `&Model` references. Pass an
/// empty string when there is none.
///
/// # Errors
///
/// With `strict` set, returns [`Error::UnresolvedSymbol`] for the first
/// symbol that does not resolve. Never fails otherwise.
pub fn resolve<S: ReplaceSource + ?Sized>(
    query: &str,
    source: &S,
    current_schema: &str,
    strict: bool,
) -> Result<String> {
    let segments: Vec<_> = Scanner::new(query).collect();

    let mut merged: HashMap<&str, &ReplaceEntry> = HashMap::new();
    for symbol in segments.iter().filter_map(|s| s.symbol.as_deref()) {
        if let Some(table) = model_of(symbol).and_then(|m| source.replace_table(m)) {
            for (key, entry) in table.entries() {
                merged.entry(key).or_insert(entry);
            }
        }
    }

    let schema_prefix = format!("{current_schema}.");
    let mut out = String::with_capacity(query.len());

    for segment in &segments {
        let Some(symbol) = segment.symbol.as_deref() else {
            out.push_str(&segment.text);
            continue;
        };

        if let Some(model_symbol) = symbol.strip_prefix(CURRENT_SCHEMA) {
            let table = model_of(model_symbol).and_then(|m| source.replace_table(m));
            match table.filter(|t| format!("&{}", t.type_name()) == model_symbol) {
                Some(table) => {
                    let to = if current_schema.is_empty() {
                        table.table().to_string()
                    } else {
                        format!("{schema_prefix}{}", table.table())
                    };
                    out.push_str(&segment.text.replace(symbol, &to));
                }
                None => unresolved(&mut out, &segment.text, symbol, strict)?,
            }
            continue;
        }

        match merged.get(symbol) {
            Some(entry) => {
                let unaliased = segment.text.find(symbol).is_some_and(|at| {
                    segment.text[..at]
                        .chars()
                        .next_back()
                        .is_none_or(crate::lexer::is_boundary)
                });
                let bare_model_reference = symbol.starts_with('&')
                    && unaliased
                    && entry.schema.is_empty()
                    && !current_schema.is_empty()
                    && !entry.to.starts_with(&schema_prefix);
                let to = if bare_model_reference {
                    format!("{schema_prefix}{}", entry.to)
                } else {
                    entry.to.clone()
                };
                out.push_str(&segment.text.replace(symbol, &to));
            }
            None => unresolved(&mut out, &segment.text, symbol, strict)?,
        }
    }
    Ok(out)
}

fn unresolved(out: &mut String, text: &str, symbol: &str, strict: bool) -> Result<()> {
    if strict {
        return Err(Error::UnresolvedSymbol(symbol.to_string()));
    }
    tracing::debug!(symbol = %symbol, "Leaving unresolved query symbol as written");
    out.push_str(text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, ModelDef};

    fn tables(namespace: &str) -> HashMap<String, ReplaceTable> {
        let defs = [
            ModelDef::new("Account")
                .field(Field::of::<i64>("ID"))
                .field(Field::of::<String>("Email").json_name("email"))
                .field(Field::of::<String>("Cache").skip()),
            ModelDef::new("Order")
                .table("orders")
                .field(Field::of::<i64>("ID"))
                .field(Field::of::<i64>("AccountID")),
        ];
        defs.iter()
            .map(|def| {
                let md = ModelDescriptor::from_def(def).unwrap();
                (md.type_name().to_string(), ReplaceTable::for_model(&md, namespace))
            })
            .collect()
    }

    #[test]
    fn test_replace_table_entries() {
        let t = &tables("shop")["Account"];
        assert_eq!(t.get("&Account").unwrap().to, "shop.account");
        assert_eq!(t.get(":Account.*").unwrap().to, "shop.account.*");
        assert_eq!(t.get(":Email").unwrap().to, "email");
        assert_eq!(t.get(":Account.Email").unwrap().to, "shop.account.email");
        assert_eq!(t.get(":Account.json.Email").unwrap().to, "'email'");
        assert!(t.get(":Cache").is_none());
    }

    #[test]
    fn test_resolve_fields_and_models() {
        let src = tables("shop");
        let sql = resolve(
            "SELECT :Account.*, o.:Order.ID FROM &Account JOIN &Order o ON :AccountID = :Account.ID WHERE :Email = ?",
            &src,
            "",
            false,
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT shop.account.*, o.shop.orders.id FROM shop.account JOIN shop.orders o ON account_id = shop.account.id WHERE email = ?"
        );
    }

    #[test]
    fn test_field_symbols_need_a_referenced_model() {
        let src = tables("shop");
        assert_eq!(
            resolve("SELECT :Email FROM users", &src, "", false).unwrap(),
            "SELECT :Email FROM users"
        );
    }

    #[test]
    fn test_json_names_and_casts() {
        let src = tables("shop");
        assert_eq!(
            resolve("SELECT doc->>:Account.json.Email, :ID::text FROM &Account", &src, "", false)
                .unwrap(),
            "SELECT doc->>'email', id::text FROM shop.account"
        );
    }

    #[test]
    fn test_current_schema_reference() {
        let src = tables("shop");
        assert_eq!(
            resolve("SELECT 1 FROM &CURRSCHEMA.&Order", &src, "tenant7", false).unwrap(),
            "SELECT 1 FROM tenant7.orders"
        );
        assert_eq!(
            resolve("SELECT 1 FROM &CURRSCHEMA.&Order", &src, "", false).unwrap(),
            "SELECT 1 FROM orders"
        );
    }

    #[test]
    fn test_unqualified_tables_take_the_calling_schema() {
        let src = tables("");
        assert_eq!(
            resolve("SELECT :ID FROM &Account", &src, "tenant7", false).unwrap(),
            "SELECT id FROM tenant7.account"
        );
        assert_eq!(
            resolve("SELECT :ID FROM a.&Account", &src, "tenant7", false).unwrap(),
            "SELECT id FROM a.account"
        );
        assert_eq!(
            resolve("SELECT :ID FROM &Account", &src, "", false).unwrap(),
            "SELECT id FROM account"
        );
    }

    #[test]
    fn test_quoted_text_is_untouched() {
        let src = tables("shop");
        assert_eq!(
            resolve("SELECT ':Email &Account' FROM &Account", &src, "", false).unwrap(),
            "SELECT ':Email &Account' FROM shop.account"
        );
    }

    #[test]
    fn test_strict_mode() {
        let src = tables("shop");
        assert_eq!(
            resolve("SELECT :Missing FROM &Account", &src, "", true).unwrap_err(),
            Error::UnresolvedSymbol(":Missing".to_string())
        );
        assert_eq!(
            resolve("SELECT :Missing FROM &Account", &src, "", false).unwrap(),
            "SELECT :Missing FROM shop.account"
        );
        assert!(resolve("SELECT :ID FROM &Account", &src, "", true).is_ok());
    }

    #[test]
    fn test_model_of() {
        assert_eq!(model_of("&Account"), Some("Account"));
        assert_eq!(model_of("&CURRSCHEMA.&Account"), Some("Account"));
        assert_eq!(model_of(":Account.ID"), Some("Account"));
        assert_eq!(model_of(":Account.json.Email"), Some("Account"));
        assert_eq!(model_of(":ID"), None);
    }
}
