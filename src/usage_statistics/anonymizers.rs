//! Deterministic salted-hash anonymizers for telemetry payloads.
//!
//! Every identifying string is reduced to a fixed-length opaque token
//! before it can appear in a usage-statistics event. Configuration blocks
//! are classified: a known core class is reported by name, anything else
//! is reported as its base class plus an anonymized class token.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Module path substituted when a data-docs site config omits one.
pub const DEFAULT_SITE_BUILDER_MODULE: &str = "expectations::render::site_builder";

const CORE_SITE_BUILDER_CLASSES: [&str; 2] = ["SiteBuilder", "DefaultSiteIndexBuilder"];

const STORE_BACKEND_MODULE: &str = "expectations::store";
const CORE_STORE_BACKEND_CLASSES: [&str; 3] = [
    "InMemoryStoreBackend",
    "FilesystemStoreBackend",
    "DatabaseStoreBackend",
];

const DATASOURCE_MODULE: &str = "expectations::datasource";
const CORE_DATASOURCE_CLASSES: [&str; 2] = ["DirectoryDatasource", "SqliteDatasource"];

/// The anonymizing primitive: a deterministic salted hash producing
/// 32-character opaque tokens.
pub struct Anonymizer {
    salt: String,
}

impl Anonymizer {
    /// Creates an anonymizer. Without a salt, a random one is generated,
    /// making tokens stable within a process but not across processes.
    pub fn new(salt: Option<String>) -> Self {
        Anonymizer {
            salt: salt.unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }

    /// The salt in use.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Hashes a value into a 32-character lowercase hex token.
    pub fn anonymize(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(value.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..32].to_string()
    }

    /// Classifies a `{class_name, module_name}` config block.
    ///
    /// A class from the core module is reported by name. Anything else is
    /// reported as `base_class` plus an anonymized class token. A config
    /// without a class name classifies as the bare base class.
    fn classify(
        &self,
        config: Option<&Value>,
        core_module: &str,
        core_classes: &[&str],
        base_class: &str,
    ) -> Map<String, Value> {
        let mut info = Map::new();
        let class_name = config
            .and_then(|config| config.get("class_name"))
            .and_then(Value::as_str);

        match class_name {
            Some(class_name) => {
                let module_name = config
                    .and_then(|config| config.get("module_name"))
                    .and_then(Value::as_str)
                    .unwrap_or(core_module);
                if module_name == core_module && core_classes.contains(&class_name) {
                    info.insert("parent_class".to_string(), json!(class_name));
                } else {
                    info.insert("parent_class".to_string(), json!(base_class));
                    info.insert(
                        "anonymized_class".to_string(),
                        json!(self.anonymize(class_name)),
                    );
                }
            }
            None => {
                info.insert("parent_class".to_string(), json!(base_class));
            }
        }
        info
    }
}

/// Anonymizes site-builder configuration blocks.
pub struct SiteBuilderAnonymizer {
    anonymizer: Anonymizer,
}

impl SiteBuilderAnonymizer {
    pub fn new(salt: Option<String>) -> Self {
        SiteBuilderAnonymizer {
            anonymizer: Anonymizer::new(salt),
        }
    }

    /// Classifies a site-builder (or site-index-builder) config block.
    pub fn anonymize_site_builder_info(&self, site_builder_config: Option<&Value>) -> Value {
        Value::Object(self.anonymizer.classify(
            site_builder_config,
            DEFAULT_SITE_BUILDER_MODULE,
            &CORE_SITE_BUILDER_CLASSES,
            "SiteBuilder",
        ))
    }
}

/// Anonymizes store-backend configuration blocks.
pub struct StoreBackendAnonymizer {
    anonymizer: Anonymizer,
}

impl StoreBackendAnonymizer {
    pub fn new(salt: Option<String>) -> Self {
        StoreBackendAnonymizer {
            anonymizer: Anonymizer::new(salt),
        }
    }

    /// Classifies a store-backend config block.
    pub fn anonymize_store_backend_info(
        &self,
        store_backend_object_config: Option<&Value>,
    ) -> Value {
        Value::Object(self.anonymizer.classify(
            store_backend_object_config,
            STORE_BACKEND_MODULE,
            &CORE_STORE_BACKEND_CLASSES,
            "StoreBackend",
        ))
    }
}

/// Anonymizes datasource declarations for the init-event payload.
pub struct DatasourceAnonymizer {
    anonymizer: Anonymizer,
}

impl DatasourceAnonymizer {
    pub fn new(salt: Option<String>) -> Self {
        DatasourceAnonymizer {
            anonymizer: Anonymizer::new(salt),
        }
    }

    /// Classifies a datasource config and anonymizes its name.
    pub fn anonymize_datasource_info(&self, name: &str, config: &Value) -> Value {
        let mut info = self.anonymizer.classify(
            Some(config),
            DATASOURCE_MODULE,
            &CORE_DATASOURCE_CLASSES,
            "Datasource",
        );
        info.insert(
            "anonymized_name".to_string(),
            json!(self.anonymizer.anonymize(name)),
        );
        Value::Object(info)
    }
}

/// Anonymizes a full data-docs site configuration.
///
/// Delegates to the site-builder and store-backend anonymizers for the
/// nested blocks and merges their outputs with an anonymized token for
/// the site's own name.
pub struct DataDocsSiteAnonymizer {
    anonymizer: Anonymizer,
    site_builder_anonymizer: SiteBuilderAnonymizer,
    store_backend_anonymizer: StoreBackendAnonymizer,
}

impl DataDocsSiteAnonymizer {
    /// Creates the anonymizer; all sub-anonymizers share one salt so
    /// tokens for the same input agree across the merged output.
    pub fn new(salt: Option<String>) -> Self {
        let salt = salt.unwrap_or_else(|| Uuid::new_v4().to_string());
        DataDocsSiteAnonymizer {
            anonymizer: Anonymizer::new(Some(salt.clone())),
            site_builder_anonymizer: SiteBuilderAnonymizer::new(Some(salt.clone())),
            store_backend_anonymizer: StoreBackendAnonymizer::new(Some(salt)),
        }
    }

    /// Anonymizes one named site configuration.
    ///
    /// The result merges: the site-builder classification of the config,
    /// an anonymized token for the site name, the anonymized store
    /// backend, and the anonymized site-index-builder sub-config. The
    /// `show_cta_footer` flag of the index builder passes through
    /// unanonymized when present. A missing `module_name` is defaulted to
    /// the core site-builder module before delegation.
    pub fn anonymize_data_docs_site_info(&self, site_name: &str, site_config: &Value) -> Value {
        let mut site_config = site_config.clone();
        if site_config.get("module_name").is_none() {
            if let Some(config) = site_config.as_object_mut() {
                config.insert(
                    "module_name".to_string(),
                    json!(DEFAULT_SITE_BUILDER_MODULE),
                );
            }
        }

        let mut info = match self
            .site_builder_anonymizer
            .anonymize_site_builder_info(Some(&site_config))
        {
            Value::Object(info) => info,
            _ => Map::new(),
        };
        info.insert(
            "anonymized_name".to_string(),
            json!(self.anonymizer.anonymize(site_name)),
        );

        info.insert(
            "anonymized_store_backend".to_string(),
            self.store_backend_anonymizer
                .anonymize_store_backend_info(site_config.get("store_backend")),
        );

        let site_index_builder_config = site_config.get("site_index_builder");
        let mut anonymized_site_index_builder = match self
            .site_builder_anonymizer
            .anonymize_site_builder_info(site_index_builder_config)
        {
            Value::Object(info) => info,
            _ => Map::new(),
        };
        if let Some(show_cta_footer) =
            site_index_builder_config.and_then(|config| config.get("show_cta_footer"))
        {
            anonymized_site_index_builder
                .insert("show_cta_footer".to_string(), show_cta_footer.clone());
        }
        info.insert(
            "anonymized_site_index_builder".to_string(),
            Value::Object(anonymized_site_index_builder),
        );

        Value::Object(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_salt() -> Option<String> {
        Some("test-salt".to_string())
    }

    #[test]
    fn test_anonymize_token_shape() {
        let anonymizer = Anonymizer::new(fixed_salt());
        let token = anonymizer.anonymize("local_site");
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_anonymize_is_deterministic_per_salt() {
        let a = Anonymizer::new(fixed_salt());
        let b = Anonymizer::new(fixed_salt());
        assert_eq!(a.anonymize("local_site"), b.anonymize("local_site"));

        let other = Anonymizer::new(Some("other-salt".to_string()));
        assert_ne!(a.anonymize("local_site"), other.anonymize("local_site"));
    }

    #[test]
    fn test_classify_core_class_passes_through() {
        let anonymizer = StoreBackendAnonymizer::new(fixed_salt());
        let info = anonymizer.anonymize_store_backend_info(Some(&json!({
            "class_name": "FilesystemStoreBackend",
            "module_name": "expectations::store",
        })));
        assert_eq!(info["parent_class"], json!("FilesystemStoreBackend"));
        assert!(info.get("anonymized_class").is_none());
    }

    #[test]
    fn test_classify_custom_class_is_anonymized() {
        let anonymizer = StoreBackendAnonymizer::new(fixed_salt());
        let info = anonymizer.anonymize_store_backend_info(Some(&json!({
            "class_name": "S3StoreBackend",
            "module_name": "my_plugin::store",
        })));
        assert_eq!(info["parent_class"], json!("StoreBackend"));
        assert_eq!(info["anonymized_class"].as_str().unwrap().len(), 32);
    }

    #[test]
    fn test_classify_missing_config_uses_base_class() {
        let anonymizer = StoreBackendAnonymizer::new(fixed_salt());
        let info = anonymizer.anonymize_store_backend_info(None);
        assert_eq!(info["parent_class"], json!("StoreBackend"));
        assert!(info.get("anonymized_class").is_none());
    }

    #[test]
    fn test_site_info_injects_default_module_name() {
        let anonymizer = DataDocsSiteAnonymizer::new(fixed_salt());
        // No module_name: the default module path is injected, so the core
        // class must classify as itself
        let info = anonymizer.anonymize_data_docs_site_info(
            "local_site",
            &json!({
                "class_name": "SiteBuilder",
                "store_backend": {
                    "class_name": "FilesystemStoreBackend",
                    "module_name": "expectations::store",
                },
                "site_index_builder": {
                    "class_name": "DefaultSiteIndexBuilder",
                },
            }),
        );

        assert_eq!(info["parent_class"], json!("SiteBuilder"));
        assert_eq!(info["anonymized_name"].as_str().unwrap().len(), 32);
        assert_eq!(
            info["anonymized_store_backend"]["parent_class"],
            json!("FilesystemStoreBackend")
        );
        assert_eq!(
            info["anonymized_site_index_builder"]["parent_class"],
            json!("DefaultSiteIndexBuilder")
        );
    }

    #[test]
    fn test_site_info_passes_cta_footer_through() {
        let anonymizer = DataDocsSiteAnonymizer::new(fixed_salt());
        let info = anonymizer.anonymize_data_docs_site_info(
            "local_site",
            &json!({
                "class_name": "SiteBuilder",
                "site_index_builder": {
                    "class_name": "DefaultSiteIndexBuilder",
                    "show_cta_footer": false,
                },
            }),
        );
        assert_eq!(
            info["anonymized_site_index_builder"]["show_cta_footer"],
            json!(false)
        );
    }

    #[test]
    fn test_site_info_has_expected_keys() {
        let anonymizer = DataDocsSiteAnonymizer::new(fixed_salt());
        let info = anonymizer.anonymize_data_docs_site_info("local_site", &json!({}));
        let info = info.as_object().unwrap();
        assert!(info.contains_key("anonymized_name"));
        assert!(info.contains_key("anonymized_store_backend"));
        assert!(info.contains_key("anonymized_site_index_builder"));
    }

    #[test]
    fn test_datasource_info_shape() {
        let anonymizer = DatasourceAnonymizer::new(fixed_salt());
        let info = anonymizer
            .anonymize_datasource_info("files", &json!({"class_name": "DirectoryDatasource"}));
        assert_eq!(info["parent_class"], json!("DirectoryDatasource"));
        assert_eq!(info["anonymized_name"].as_str().unwrap().len(), 32);
    }
}
