//! Alias Resolver
//!
//! Maps colloquial product names ("js", "golang", "c#") to the canonical literals
//! the schema declares. Exact literal mentions win over aliases.

use crate::translate::text::contains_term;
use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap};

lazy_static! {
    static ref DEFAULT_ALIASES: Vec<(&'static str, Vec<&'static str>)> = vec![
        ("js", vec!["JavaScript", "JavaScript (Node.JS)", "JavaScript RLC"]),
        ("javascript", vec!["JavaScript", "JavaScript (Node.JS)", "JavaScript RLC"]),
        ("node", vec!["JavaScript (Node.JS)"]),
        ("nodejs", vec!["JavaScript (Node.JS)"]),
        ("node.js", vec!["JavaScript (Node.JS)"]),
        ("rlc", vec!["JavaScript RLC"]),
        (".net", vec![".Net Code-gen", ".Net Fluent"]),
        ("dotnet", vec![".Net Code-gen", ".Net Fluent"]),
        ("csharp", vec![".Net Code-gen", ".Net Fluent"]),
        ("c#", vec![".Net Code-gen", ".Net Fluent"]),
        ("net", vec![".Net Code-gen", ".Net Fluent"]),
        ("java", vec!["Java Fluent Lite", "Java Fluent Premium"]),
        ("python", vec!["Python-SDK"]),
        ("py", vec!["Python-SDK"]),
        ("go", vec!["Go-SDK"]),
        ("golang", vec!["Go-SDK"]),
        ("php", vec!["PHP-SDK"]),
        ("ruby", vec!["Ruby-SDK"]),
        ("rb", vec!["Ruby-SDK"]),
        ("rust", vec!["Rust"]),
        ("rs", vec!["Rust"]),
        ("cli", vec!["AzureCLI"]),
        ("azure-cli", vec!["AzureCLI"]),
        ("az", vec!["AzureCLI"]),
        ("powershell", vec!["AzurePowershell"]),
        ("ps", vec!["AzurePowershell"]),
        ("pwsh", vec!["AzurePowershell"]),
        ("terraform", vec!["Terraform"]),
        ("tf", vec!["Terraform"]),
        ("ansible", vec!["Ansible"]),
        ("vscode", vec!["VS Code Azure Extension"]),
        ("vs-code", vec!["VS Code Azure Extension"]),
        ("visual-studio-code", vec!["VS Code Azure Extension"]),
    ];
}

#[derive(Debug, Clone)]
pub struct AliasResolver {
    /// alias (lower-case) -> canonical names, in registration order
    aliases: Vec<(String, Vec<String>)>,
}

impl Default for AliasResolver {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(alias, products)| {
                    (
                        alias.to_string(),
                        products.iter().map(|p| p.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical values mentioned by `text`, in the order of `canonical_values`.
    ///
    /// Literal mentions are checked first; aliases are consulted only when no
    /// literal matched, and only values present in `canonical_values` are returned.
    pub fn resolve(&self, text: &str, canonical_values: &[String]) -> Vec<String> {
        let text_lower = text.to_lowercase();

        let literal: Vec<String> = canonical_values
            .iter()
            .filter(|value| contains_term(&text_lower, &value.to_lowercase()))
            .cloned()
            .collect();
        if !literal.is_empty() {
            return literal;
        }

        let mut hits = BTreeSet::new();
        for (alias, products) in &self.aliases {
            if contains_term(&text_lower, alias) {
                hits.extend(products.iter().cloned());
            }
        }

        canonical_values
            .iter()
            .filter(|value| hits.contains(*value))
            .cloned()
            .collect()
    }

    pub fn add_alias(&mut self, alias: &str, products: &[&str]) {
        let alias = alias.to_lowercase();
        match self.aliases.iter_mut().find(|(a, _)| *a == alias) {
            Some((_, existing)) => {
                for product in products {
                    if !existing.iter().any(|p| p == product) {
                        existing.push(product.to_string());
                    }
                }
            }
            None => self
                .aliases
                .push((alias, products.iter().map(|p| p.to_string()).collect())),
        }
    }

    pub fn aliases_for(&self, product: &str) -> Vec<&str> {
        self.aliases
            .iter()
            .filter(|(_, products)| products.iter().any(|p| p == product))
            .map(|(alias, _)| alias.as_str())
            .collect()
    }

    pub fn all(&self) -> HashMap<&str, &[String]> {
        self.aliases
            .iter()
            .map(|(alias, products)| (alias.as_str(), products.as_slice()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products() -> Vec<String> {
        [
            "Go-SDK",
            "Python-SDK",
            "JavaScript",
            "JavaScript (Node.JS)",
            "JavaScript RLC",
            ".Net Fluent",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_literal_match_wins() {
        let resolver = AliasResolver::new();
        assert_eq!(resolver.resolve("Go-SDK usage", &products()), vec!["Go-SDK"]);
    }

    #[test]
    fn test_alias_expands_to_all_variants() {
        let resolver = AliasResolver::new();
        assert_eq!(
            resolver.resolve("requests from js clients", &products()),
            vec!["JavaScript", "JavaScript (Node.JS)", "JavaScript RLC"]
        );
    }

    #[test]
    fn test_alias_filtered_to_schema_values() {
        let resolver = AliasResolver::new();
        // Only ".Net Fluent" exists in this schema
        assert_eq!(resolver.resolve("dotnet traffic", &products()), vec![".Net Fluent"]);
        assert!(resolver.resolve("ruby traffic", &products()).is_empty());
    }

    #[test]
    fn test_short_alias_needs_word_boundary() {
        let resolver = AliasResolver::new();
        assert!(resolver.resolve("google searches", &products()).is_empty());
    }

    #[test]
    fn test_add_alias() {
        let mut resolver = AliasResolver::new();
        resolver.add_alias("gopher", &["Go-SDK"]);
        assert_eq!(resolver.resolve("gopher stats", &products()), vec!["Go-SDK"]);
        assert!(resolver.aliases_for("Go-SDK").contains(&"gopher"));
    }
}
