use crate::domain::model::ArxmlModel;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    #[default]
    All,
    Components,
    Ports,
    Packages,
    Interfaces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Contains,
    StartsWith,
    EndsWith,
    Exact,
    Regex,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Package,
    Component,
    Port,
    Interface,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Package => "package",
            ItemType::Component => "component",
            ItemType::Port => "port",
            ItemType::Interface => "interface",
        }
    }

    fn in_scope(&self, scope: SearchScope) -> bool {
        match scope {
            SearchScope::All => true,
            SearchScope::Components => *self == ItemType::Component,
            SearchScope::Ports => *self == ItemType::Port,
            SearchScope::Packages => *self == ItemType::Package,
            SearchScope::Interfaces => *self == ItemType::Interface,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Name,
    SearchableText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub item_name: String,
    pub item_type: ItemType,
    pub item_uuid: String,
    pub match_field: MatchField,
    pub relevance_score: f64,
    pub parent_package: Option<String>,
    pub match_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchStatistics {
    pub total_indexed_items: usize,
    pub items_by_type: BTreeMap<ItemType, usize>,
    pub packages_indexed: usize,
    pub unique_words: usize,
}

#[derive(Debug, Clone)]
struct IndexedItem {
    name: String,
    item_type: ItemType,
    uuid: String,
    package_path: Option<String>,
    /// Name, description and type tags joined by spaces, original case.
    searchable_text: String,
    searchable_lower: String,
}

enum CompiledQuery {
    Plain(String),
    Pattern(Regex),
    // 無效的正規表示式: 退回名稱包含比對
    InvalidPattern(String),
}

/// Linear-scan search over everything parsed from one model.
#[derive(Debug, Default)]
pub struct SearchEngine {
    items: Vec<IndexedItem>,
    word_index: HashMap<String, Vec<usize>>,
    packages_indexed: usize,
    case_sensitive: bool,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            ..Self::default()
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn build_index(&mut self, model: &ArxmlModel) {
        self.items.clear();
        self.word_index.clear();
        self.packages_indexed = model.packages.len();

        for package in model.all_packages() {
            self.index_item(
                &package.short_name,
                ItemType::Package,
                &package.uuid,
                Some(&package.full_path),
                &[package.desc.as_deref()],
            );

            for component in &package.components {
                self.index_item(
                    &component.short_name,
                    ItemType::Component,
                    &component.uuid,
                    Some(&package.full_path),
                    &[component.desc.as_deref(), Some(component.component_type.tag())],
                );

                for port in component.all_ports() {
                    self.index_item(
                        &port.short_name,
                        ItemType::Port,
                        &port.uuid,
                        Some(&package.full_path),
                        &[port.desc.as_deref(), Some(port.port_type.tag())],
                    );
                }
            }
        }

        for interface in &model.interfaces {
            self.index_item(
                &interface.short_name,
                ItemType::Interface,
                &interface.uuid,
                interface.package_path.as_deref(),
                &[interface.desc.as_deref(), Some(interface.interface_type.tag())],
            );
        }

        tracing::debug!(
            "🔍 Search index built: {} items, {} words",
            self.items.len(),
            self.word_index.len()
        );
    }

    fn index_item(
        &mut self,
        name: &str,
        item_type: ItemType,
        uuid: &str,
        package_path: Option<&str>,
        extra: &[Option<&str>],
    ) {
        let mut parts = vec![name];
        parts.extend(extra.iter().flatten().filter(|s| !s.is_empty()));
        let searchable_text = parts.join(" ");
        let searchable_lower = searchable_text.to_lowercase();

        let id = self.items.len();
        for word in searchable_lower.split_whitespace() {
            let ids = self.word_index.entry(word.to_string()).or_default();
            if ids.last() != Some(&id) {
                ids.push(id);
            }
        }

        self.items.push(IndexedItem {
            name: name.to_string(),
            item_type,
            uuid: uuid.to_string(),
            package_path: package_path.map(str::to_string),
            searchable_text,
            searchable_lower,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn search(
        &self,
        query: &str,
        scope: SearchScope,
        mode: SearchMode,
        max_results: usize,
    ) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let compiled = self.compile(query, mode);
        let mut results: Vec<SearchResult> = self
            .items
            .iter()
            .filter(|item| item.item_type.in_scope(scope))
            .filter_map(|item| {
                let (score, field) = self.match_score(&compiled, item, mode)?;
                Some(SearchResult {
                    item_name: item.name.clone(),
                    item_type: item.item_type,
                    item_uuid: item.uuid.clone(),
                    match_field: field,
                    relevance_score: score,
                    parent_package: item.package_path.clone(),
                    match_text: item.searchable_lower.clone(),
                })
            })
            .collect();

        // sort_by 為穩定排序, 同分時保留索引順序
        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if max_results > 0 {
            results.truncate(max_results);
        }
        results
    }

    fn normalize(&self, text: &str) -> String {
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }

    fn compile(&self, query: &str, mode: SearchMode) -> CompiledQuery {
        if mode != SearchMode::Regex {
            return CompiledQuery::Plain(self.normalize(query));
        }
        match RegexBuilder::new(query)
            .case_insensitive(!self.case_sensitive)
            .build()
        {
            Ok(re) => CompiledQuery::Pattern(re),
            Err(e) => {
                tracing::warn!("Invalid search pattern '{}': {}", query, e);
                CompiledQuery::InvalidPattern(self.normalize(query))
            }
        }
    }

    fn match_score(
        &self,
        query: &CompiledQuery,
        item: &IndexedItem,
        mode: SearchMode,
    ) -> Option<(f64, MatchField)> {
        let name = self.normalize(&item.name);
        let text = if self.case_sensitive {
            item.searchable_text.as_str()
        } else {
            item.searchable_lower.as_str()
        };
        let name_hit = |score: f64| Some((score, MatchField::Name));
        let text_hit = |score: f64| Some((score, MatchField::SearchableText));

        match query {
            CompiledQuery::Pattern(re) => {
                if re.is_match(&name) {
                    name_hit(0.8)
                } else if re.is_match(text) {
                    text_hit(0.5)
                } else {
                    None
                }
            }
            CompiledQuery::InvalidPattern(q) => {
                if name.contains(q.as_str()) {
                    name_hit(0.7)
                } else {
                    None
                }
            }
            CompiledQuery::Plain(q) => {
                let q = q.as_str();
                match mode {
                    SearchMode::Exact => {
                        if name == q {
                            name_hit(1.0)
                        } else if text.contains(q) {
                            text_hit(0.5)
                        } else {
                            None
                        }
                    }
                    SearchMode::StartsWith => {
                        if name.starts_with(q) {
                            name_hit(0.9)
                        } else if text.split_whitespace().any(|w| w.starts_with(q)) {
                            text_hit(0.6)
                        } else {
                            None
                        }
                    }
                    SearchMode::EndsWith => {
                        if name.ends_with(q) {
                            name_hit(0.9)
                        } else if text.split_whitespace().any(|w| w.ends_with(q)) {
                            text_hit(0.6)
                        } else {
                            None
                        }
                    }
                    SearchMode::Contains | SearchMode::Regex => {
                        if name.contains(q) {
                            name_hit(0.8)
                        } else if text.contains(q) {
                            text_hit(0.5)
                        } else {
                            None
                        }
                    }
                    SearchMode::Fuzzy => {
                        let score = fuzzy_match_score(q, &name);
                        if score > 0.7 {
                            return name_hit(score * 0.8);
                        }
                        text.split_whitespace()
                            .map(|w| fuzzy_match_score(q, w))
                            .find(|s| *s > 0.7)
                            .and_then(|s| text_hit(s * 0.6))
                    }
                }
            }
        }
    }

    /// Completions for a partial query: matching item names plus longer indexed words.
    pub fn suggestions(&self, query: &str, max_suggestions: usize) -> Vec<String> {
        let query_lower = query.to_lowercase();
        let mut suggestions = std::collections::BTreeSet::new();

        for item in &self.items {
            if item.name.to_lowercase().starts_with(&query_lower) {
                suggestions.insert(item.name.clone());
            }
            for word in item.searchable_lower.split_whitespace() {
                if word.starts_with(&query_lower) && word.len() > query_lower.len() {
                    suggestions.insert(word.to_string());
                }
            }
            if suggestions.len() >= max_suggestions {
                break;
            }
        }

        suggestions.into_iter().take(max_suggestions).collect()
    }

    /// UUIDs of the items whose searchable text contains `word` as a whole word.
    pub fn items_with_word(&self, word: &str) -> Vec<&str> {
        self.word_index
            .get(&word.to_lowercase())
            .map(|ids| ids.iter().map(|id| self.items[*id].uuid.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn statistics(&self) -> SearchStatistics {
        let mut items_by_type = BTreeMap::new();
        for item in &self.items {
            *items_by_type.entry(item.item_type).or_insert(0) += 1;
        }
        SearchStatistics {
            total_indexed_items: self.items.len(),
            items_by_type,
            packages_indexed: self.packages_indexed,
            unique_words: self.word_index.len(),
        }
    }
}

/// 1.0 for equal strings, 0.8 for a substring, else the share of query characters found in `text`.
pub fn fuzzy_match_score(query: &str, text: &str) -> f64 {
    if query.is_empty() || text.is_empty() {
        return 0.0;
    }
    let query = query.to_lowercase();
    let text = text.to_lowercase();

    if query == text {
        return 1.0;
    }
    if text.contains(&query) {
        return 0.8;
    }

    let total = query.chars().count();
    let matched = query.chars().filter(|c| text.contains(*c)).count();
    matched as f64 / total as f64
}
