//! Storage configuration: TOML file format, endpoint resolution and opening.
//!
//! ```toml
//! collection = "default"
//!
//! [endpoint]
//! uri = "file:///var/lib/topic-store"
//! # or: mongo_config = "/etc/mongod.yaml"
//!
//! [engine]
//! walk_mode = "rebuild"
//! max_depth = 64
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tstore_blob::FsBlobStore;
use tstore_docs::FsDocumentStore;

use crate::error::{EngineError, EngineResult};
use crate::storage::TopicStorage;
use crate::walker::{TreeWalker, WalkMode, DEFAULT_MAX_DEPTH};

/// Endpoint of the packaged default MongoDB configuration.
pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:65530";

/// Endpoint names that select [`DEFAULT_MONGO_URI`].
pub const DEFAULT_ALIASES: [&str; 3] = ["auto", "default", "topic_store"];

const FILE_SCHEME: &str = "file://";
const MONGO_SCHEME: &str = "mongodb://";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub collection: String,
    pub endpoint: EndpointConfig,
    pub engine: EngineConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            collection: "default".into(),
            endpoint: EndpointConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Where the stores live. `uri` wins over `mongo_config` when both are set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub uri: Option<String>,
    pub mongo_config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub walk_mode: WalkMode,
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            walk_mode: WalkMode::Rebuild,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn walker(&self) -> TreeWalker {
        TreeWalker::new()
            .with_mode(self.walk_mode)
            .with_max_depth(self.max_depth)
    }
}

/// A resolved connection endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// File-backed stores under a local directory.
    Local(PathBuf),
    /// A MongoDB server URI.
    Mongo(String),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(dir) => write!(f, "{FILE_SCHEME}{}", dir.display()),
            Self::Mongo(uri) => f.write_str(uri),
        }
    }
}

impl StorageConfig {
    /// Config for file-backed stores rooted at `dir`.
    pub fn local(dir: impl AsRef<Path>) -> Self {
        Self {
            endpoint: EndpointConfig {
                uri: Some(format!("{FILE_SCHEME}{}", dir.as_ref().display())),
                mongo_config: None,
            },
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| EngineError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    fn validate(&self) -> EngineResult<()> {
        let name = self.collection.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(EngineError::Config(format!(
                "invalid collection name '{name}'"
            )));
        }
        Ok(())
    }

    /// Resolve the configured endpoint.
    ///
    /// Without any endpoint the packaged default is used.
    pub fn resolve_endpoint(&self) -> EngineResult<Endpoint> {
        if let Some(uri) = &self.endpoint.uri {
            return parse_uri(uri);
        }
        match &self.endpoint.mongo_config {
            Some(path) if is_alias(&path.to_string_lossy()) => {
                Ok(Endpoint::Mongo(DEFAULT_MONGO_URI.into()))
            }
            Some(path) => endpoint_from_mongo_config(path).map(Endpoint::Mongo),
            None => Ok(Endpoint::Mongo(DEFAULT_MONGO_URI.into())),
        }
    }
}

fn is_alias(name: &str) -> bool {
    DEFAULT_ALIASES.contains(&name)
}

fn parse_uri(uri: &str) -> EngineResult<Endpoint> {
    if is_alias(uri) {
        return Ok(Endpoint::Mongo(DEFAULT_MONGO_URI.into()));
    }
    if let Some(dir) = uri.strip_prefix(FILE_SCHEME) {
        if dir.is_empty() {
            return Err(EngineError::Config("file:// endpoint without a directory".into()));
        }
        return Ok(Endpoint::Local(PathBuf::from(dir)));
    }
    if uri.starts_with(MONGO_SCHEME) && uri.len() > MONGO_SCHEME.len() {
        return Ok(Endpoint::Mongo(uri.to_string()));
    }
    Err(EngineError::Config(format!("unsupported endpoint '{uri}'")))
}

#[derive(Deserialize)]
struct MongoYaml {
    net: MongoNet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MongoNet {
    bind_ip: String,
    port: u16,
}

/// Derive `mongodb://<bindIp>:<port>` from a MongoDB YAML config file.
///
/// The file must exist and carry a `.yaml` suffix.
pub fn endpoint_from_mongo_config(path: &Path) -> EngineResult<String> {
    let invalid = || {
        EngineError::Config(format!(
            "'{}' is not a valid MongoDB configuration file",
            path.display()
        ))
    };
    if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("yaml") {
        return Err(invalid());
    }
    let raw = std::fs::read_to_string(path).map_err(|_| invalid())?;
    let parsed: MongoYaml = serde_yaml::from_str(&raw)
        .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
    Ok(format!("{MONGO_SCHEME}{}:{}", parsed.net.bind_ip, parsed.net.port))
}

/// Build a [`TopicStorage`] for `config`.
///
/// File endpoints open an [`FsDocumentStore`] at `<dir>/<collection>/docs`
/// and an [`FsBlobStore`] at `<dir>/<collection>/blobs`. MongoDB endpoints
/// resolve but cannot be opened: no network driver is compiled in.
pub fn open(config: &StorageConfig) -> EngineResult<TopicStorage> {
    config.validate()?;
    let root = match config.resolve_endpoint()? {
        Endpoint::Local(dir) => dir.join(&config.collection),
        Endpoint::Mongo(uri) => {
            return Err(EngineError::Config(format!(
                "no driver for remote endpoint '{uri}'; use a file:// endpoint"
            )))
        }
    };
    let docs = FsDocumentStore::open(root.join("docs"))?;
    let blobs = FsBlobStore::open(root.join("blobs")).map_err(|e| {
        EngineError::Config(format!("cannot open blob store under {}: {e}", root.display()))
    })?;
    tracing::info!(root = %root.display(), collection = %config.collection, "storage opened");
    Ok(TopicStorage::new(Arc::new(docs), Arc::new(blobs)).with_walker(config.engine.walker()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tstore_types::{Document, Record, Value};

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults() {
        let c = StorageConfig::default();
        assert_eq!(c.collection, "default");
        assert_eq!(c.engine.walk_mode, WalkMode::Rebuild);
        assert_eq!(c.engine.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(
            c.resolve_endpoint().unwrap(),
            Endpoint::Mongo(DEFAULT_MONGO_URI.into())
        );
    }

    #[test]
    fn parses_toml_sections() {
        let c = StorageConfig::from_toml_str(
            r#"
            collection = "runs"
            [endpoint]
            uri = "file:///tmp/ts"
            [engine]
            walk_mode = "in_place"
            max_depth = 8
            "#,
        )
        .unwrap();
        assert_eq!(c.collection, "runs");
        assert_eq!(c.resolve_endpoint().unwrap(), Endpoint::Local("/tmp/ts".into()));
        assert_eq!(c.engine.walker().mode(), WalkMode::InPlace);
        assert_eq!(c.engine.walker().max_depth(), 8);
    }

    #[test]
    fn toml_round_trip() {
        let c = StorageConfig::local("/data");
        let back = StorageConfig::from_toml_str(&c.to_toml_string().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn rejects_bad_collection_and_syntax() {
        for raw in ["collection = \"a/b\"", "collection = \"\"", "collection = ["] {
            let err = StorageConfig::from_toml_str(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        }
    }

    #[test]
    fn aliases_select_default_endpoint() {
        for alias in DEFAULT_ALIASES {
            let mut c = StorageConfig::default();
            c.endpoint.mongo_config = Some(alias.into());
            assert_eq!(
                c.resolve_endpoint().unwrap(),
                Endpoint::Mongo(DEFAULT_MONGO_URI.into())
            );
        }
    }

    #[test]
    fn unsupported_scheme_is_config_error() {
        let mut c = StorageConfig::default();
        c.endpoint.uri = Some("redis://x".into());
        assert_eq!(
            c.resolve_endpoint().unwrap_err().kind(),
            ErrorKind::ConfigurationError
        );
    }

    // -----------------------------------------------------------------------
    // MongoDB YAML
    // -----------------------------------------------------------------------

    #[test]
    fn reads_bind_ip_and_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "mongod.yaml",
            "storage:\n  dbPath: /data/db\nnet:\n  bindIp: 127.0.0.1\n  port: 27017\n",
        );
        assert_eq!(
            endpoint_from_mongo_config(&path).unwrap(),
            "mongodb://127.0.0.1:27017"
        );

        let mut c = StorageConfig::default();
        c.endpoint.mongo_config = Some(path);
        assert_eq!(
            c.resolve_endpoint().unwrap(),
            Endpoint::Mongo("mongodb://127.0.0.1:27017".into())
        );
    }

    #[test]
    fn mongo_config_requires_existing_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let wrong_suffix = write(dir.path(), "mongod.yml", "net:\n  bindIp: a\n  port: 1\n");
        let missing_net = write(dir.path(), "empty.yaml", "storage: {}\n");
        for path in [wrong_suffix, missing_net, dir.path().join("absent.yaml")] {
            let err = endpoint_from_mongo_config(&path).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        }
    }

    // -----------------------------------------------------------------------
    // Opening
    // -----------------------------------------------------------------------

    #[test]
    fn open_local_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::local(dir.path());
        let record = Record::new(Document::new().with("blob", vec![4u8; 1024])).with_session("S");

        let id = open(&config).unwrap().insert_one(&record).unwrap();
        assert!(dir.path().join("default").join("docs").is_dir());
        assert!(dir.path().join("default").join("blobs").is_dir());

        let reopened = open(&config).unwrap();
        let back = reopened.find_by_id(&id).unwrap();
        assert_eq!(back.get("blob"), Some(&Value::from(vec![4u8; 1024])));
        assert_eq!(back.session(), Some("S"));
    }

    #[test]
    fn open_remote_is_config_error() {
        let err = open(&StorageConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }
}
