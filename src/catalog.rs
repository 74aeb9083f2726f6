// Service catalog: which services exist and how each one is broken down.
//
// The catalog is configuration. It is built once (the registry default or a
// JSON file) and handed to the analyzer by reference.
use crate::error::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "categories", rename_all = "snake_case")]
pub enum CategorySet {
    NoCategory,
    WithCategories(Vec<String>),
}

impl CategorySet {
    pub fn categories(&self) -> &[String] {
        match self {
            CategorySet::NoCategory => &[],
            CategorySet::WithCategories(list) => list,
        }
    }

    pub fn has_categories(&self) -> bool {
        !self.categories().is_empty()
    }

    /// Whether a report's category belongs to this set. Uncategorized
    /// services (and an empty category list) accept any report.
    pub fn accepts(&self, category: Option<&str>) -> bool {
        match self {
            CategorySet::NoCategory => true,
            CategorySet::WithCategories(list) => {
                list.is_empty() || category.is_some_and(|c| list.iter().any(|known| known == c))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub categories: CategorySet,
}

/// Ordered list of known services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCatalog {
    pub services: Vec<ServiceDefinition>,
}

static NO_CATEGORY: CategorySet = CategorySet::NoCategory;

const VITAL_EVENT_CATEGORIES: [&str; 3] = ["በወቅቱ", "በዘገየ", "በነባር"];

static DEFAULT_CATALOG: Lazy<ServiceCatalog> = Lazy::new(|| {
    let list = |items: &[&str]| {
        CategorySet::WithCategories(items.iter().map(|s| s.to_string()).collect())
    };
    let vital = || list(&VITAL_EVENT_CATEGORIES);
    ServiceCatalog::new(vec![
        ("ልደት", vital()),
        ("ጋብቻ", vital()),
        ("ሞት", vital()),
        ("ፍቺ", vital()),
        ("ጉዲፈቻ", vital()),
        ("እርማት፣እድሳት እና ግልባጭ", CategorySet::NoCategory),
        ("የነዋሪነት ምዝገባ", CategorySet::NoCategory),
        ("መታወቂያ", list(&["አዲስ", "እድሳት", "ምትክ"])),
        ("ያላገባ", list(&["አዲስ", "እድሳት", "እርማት", "ምትክ"])),
        ("መሸኛ", CategorySet::NoCategory),
        ("የዝምድና አገልግሎት", CategorySet::NoCategory),
        ("የነዋሪነት ማረጋገጫ", CategorySet::NoCategory),
        ("በህይወት ስለመኖር", CategorySet::NoCategory),
    ])
});

impl ServiceCatalog {
    pub fn new<S: Into<String>>(services: Vec<(S, CategorySet)>) -> Self {
        Self {
            services: services
                .into_iter()
                .map(|(name, categories)| ServiceDefinition {
                    name: name.into(),
                    categories,
                })
                .collect(),
        }
    }

    /// The registry's production service list.
    pub fn registry_default() -> &'static ServiceCatalog {
        &DEFAULT_CATALOG
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let catalog: ServiceCatalog = serde_json::from_str(&raw)?;
        Ok(catalog)
    }

    pub fn get(&self, service_name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name == service_name)
    }

    /// Category set for a service; unknown services are uncategorized.
    pub fn categories_for(&self, service_name: &str) -> &CategorySet {
        self.get(service_name)
            .map(|s| &s.categories)
            .unwrap_or(&NO_CATEGORY)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
