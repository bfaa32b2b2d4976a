//! Version-aware index template generation.
//!
//! The span index template differs between engine generations: 2.x spells an
//! exact-match field as an unanalyzed `string`, 5.x and later as `keyword`, and
//! tokenized trace ids on 5.x need `fielddata` switched on before they can be
//! aggregated. [`generate_template`] hides those differences behind one call.
//!
//! Generation is pure: no I/O, no shared state, and identical inputs always
//! serialize to identical bytes.
//!
//! # Example
//!
//! ```
//! use spanstore_persistence::{StorageConfig, generate_template};
//!
//! let template = generate_template("5.0.0", &StorageConfig::default()).unwrap();
//! assert_eq!(
//!     template.trace_id_mapping().to_string(),
//!     r#"{"type":"keyword"}"#
//! );
//! ```

use std::fmt;

use serde_json::{Value, json};

use crate::config::StorageConfig;
use crate::error::{TemplateError, TemplateResult};

/// Name of the analyzer that tokenizes trace ids.
pub const TRACE_ID_ANALYZER: &str = "traceId_analyzer";

/// Document type holding spans.
pub const SPAN_TYPE: &str = "span";

/// Version string reported by the search engine, reduced to its major number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVersion {
    raw: String,
    major: u32,
}

impl EngineVersion {
    /// Parses a version such as `2.4.0` or `5.0.0-alpha5`.
    ///
    /// Only the leading major number is significant, but it must be present.
    pub fn parse(version: &str) -> TemplateResult<Self> {
        let trimmed = version.trim();
        let major_part = trimmed.split('.').next().unwrap_or_default();

        if major_part.is_empty() {
            return Err(invalid_version(version, "missing major version"));
        }

        let major = major_part
            .parse::<u32>()
            .map_err(|e| invalid_version(version, &format!("major version: {}", e)))?;

        Ok(Self {
            raw: trimmed.to_string(),
            major,
        })
    }

    /// The major version number.
    pub fn major(&self) -> u32 {
        self.major
    }

    /// The version string as reported.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid_version(version: &str, message: &str) -> TemplateError {
    TemplateError::InvalidVersion {
        version: version.to_string(),
        message: message.to_string(),
    }
}

/// Field-type vocabulary of one engine generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingDialect {
    /// 2.x: exact-match fields are `string` with `"index": "not_analyzed"`.
    Legacy,
    /// 5.x and later: exact-match fields are `keyword`.
    Keyword,
}

/// Lowest major version served by each dialect, oldest first.
const DIALECTS: &[(u32, MappingDialect)] = &[
    (2, MappingDialect::Legacy),
    (5, MappingDialect::Keyword),
];

impl MappingDialect {
    /// Selects the dialect for an engine version.
    pub fn for_version(version: &EngineVersion) -> TemplateResult<Self> {
        DIALECTS
            .iter()
            .rev()
            .find(|(min_major, _)| version.major() >= *min_major)
            .map(|(_, dialect)| *dialect)
            .ok_or_else(|| TemplateError::UnsupportedVersion {
                version: version.as_str().to_string(),
                major: version.major(),
            })
    }

    /// Mapping for a field matched exactly, never tokenized.
    pub fn keyword(self) -> Value {
        match self {
            MappingDialect::Legacy => json!({"type": "string", "index": "not_analyzed"}),
            MappingDialect::Keyword => json!({"type": "keyword"}),
        }
    }

    /// Mapping for the trace id field.
    ///
    /// Tokenized trace ids on [`MappingDialect::Keyword`] enable fielddata,
    /// which the engine keeps on-heap per shard.
    pub fn trace_id(self, strict: bool) -> Value {
        match (self, strict) {
            (dialect, true) => dialect.keyword(),
            (MappingDialect::Legacy, false) => {
                json!({"type": "string", "analyzer": TRACE_ID_ANALYZER})
            }
            (MappingDialect::Keyword, false) => {
                json!({"type": "string", "fielddata": "true", "analyzer": TRACE_ID_ANALYZER})
            }
        }
    }

    fn keyword_with_limit(self, ignore_above: u32) -> Value {
        let mut mapping = self.keyword();
        if let Value::Object(fields) = &mut mapping {
            fields.insert("ignore_above".to_string(), json!(ignore_above));
        }
        mapping
    }
}

/// A generated index template document.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexTemplate {
    dialect: MappingDialect,
    requires_fielddata: bool,
    body: Value,
}

impl IndexTemplate {
    /// The full template document.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The `mappings.span.properties.traceId` definition.
    pub fn trace_id_mapping(&self) -> &Value {
        &self.body["mappings"][SPAN_TYPE]["properties"]["traceId"]
    }

    /// Dialect the template was written in.
    pub fn dialect(&self) -> MappingDialect {
        self.dialect
    }

    /// Whether the trace id mapping turns on fielddata (memory-expensive).
    pub fn requires_fielddata(&self) -> bool {
        self.requires_fielddata
    }

    /// Compact JSON, as submitted to the cluster.
    pub fn to_json_string(&self) -> String {
        self.body.to_string()
    }
}

impl fmt::Display for IndexTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pretty = serde_json::to_string_pretty(&self.body).map_err(|_| fmt::Error)?;
        f.write_str(&pretty)
    }
}

/// Generates the span index template for an engine version.
///
/// Fails with [`TemplateError::InvalidVersion`] when `version` has no numeric
/// major part and [`TemplateError::UnsupportedVersion`] for engines older than 2.x.
pub fn generate_template(version: &str, config: &StorageConfig) -> TemplateResult<IndexTemplate> {
    let version = EngineVersion::parse(version)?;
    let dialect = MappingDialect::for_version(&version)?;
    let keyword = dialect.keyword();

    let endpoint = json!({
        "type": "object",
        "dynamic": false,
        "properties": {
            "serviceName": keyword
        }
    });

    let body = json!({
        "template": config.index_pattern(),
        "settings": {
            "index.number_of_shards": config.index_shards,
            "index.number_of_replicas": config.index_replicas,
            "index.requests.cache.enable": true,
            "index.mapper.dynamic": false,
            "analysis": {
                "analyzer": {
                    TRACE_ID_ANALYZER: {
                        "type": "custom",
                        "tokenizer": "keyword",
                        "filter": "traceId_filter"
                    }
                },
                "filter": {
                    // Also index the low 64 bits, so 128-bit ids match their 64-bit form
                    "traceId_filter": {
                        "type": "pattern_capture",
                        "patterns": ["([0-9a-f]{1,16})$"],
                        "preserve_original": true
                    }
                }
            }
        },
        "mappings": {
            "_default_": {
                "dynamic_templates": [
                    {
                        "strings": {
                            "mapping": dialect.keyword_with_limit(256),
                            "match_mapping_type": "string",
                            "match": "*"
                        }
                    }
                ]
            },
            SPAN_TYPE: {
                "properties": {
                    "traceId": dialect.trace_id(config.strict_trace_id),
                    "name": keyword,
                    "timestamp_millis": {
                        "type": "date",
                        "format": "epoch_millis"
                    },
                    "duration": { "type": "long" },
                    "annotations": {
                        "type": "nested",
                        "dynamic": false,
                        "properties": {
                            "value": keyword,
                            "endpoint": endpoint
                        }
                    },
                    "binaryAnnotations": {
                        "type": "nested",
                        "dynamic": false,
                        "properties": {
                            "key": keyword,
                            "value": keyword,
                            "endpoint": endpoint
                        }
                    }
                }
            },
            "dependencylink": { "enabled": false },
            "servicespan": {
                "properties": {
                    "serviceName": keyword,
                    "spanName": keyword
                }
            }
        }
    });

    Ok(IndexTemplate {
        dialect,
        requires_fielddata: dialect == MappingDialect::Keyword && !config.strict_trace_id,
        body,
    })
}
