use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use rand::Rng;

use crate::defaults;
use crate::document::ConfigDocument;
use crate::error::{ConfigError, ConfigResult};
use crate::live::{self, ConfigChange, LiveConfig};
use crate::metrics::Metrics;

/// Owner of the on-disk configuration file and the live mirror.
///
/// Manages two files:
/// - The config file: the durable persisted state, created by
///   [`initialize`](Self::initialize) and mutated by the write operations.
/// - The default template: read-only, shipped alongside the system, defining
///   the full universe of valid sections and keys.
///
/// Each public operation is a one-shot synchronous transaction against the
/// file. A mutex scoped to the file serializes every read-modify-write cycle,
/// so concurrent callers cannot clobber each other's writes. Persistence is
/// atomic (temp file in the same directory, then rename): a failed operation
/// leaves the previously persisted file untouched.
pub struct ConfigStore {
    config_path: Utf8PathBuf,
    template_path: Utf8PathBuf,

    /// Critical section around the file read-modify-write cycle
    file_lock: Mutex<()>,

    live: LiveConfig,
    metrics: Arc<Metrics>,
}

impl ConfigStore {
    /// Create a store over the given config file and default template paths.
    ///
    /// Does not touch the filesystem - call [`ensure_ready`](Self::ensure_ready)
    /// (or `initialize` / `refresh` directly) after.
    pub fn new(config_path: impl AsRef<Utf8Path>, template_path: impl AsRef<Utf8Path>) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            template_path: template_path.as_ref().to_path_buf(),
            file_lock: Mutex::new(()),
            live: LiveConfig::new(Arc::clone(&metrics)),
            metrics,
        }
    }

    /// A cheap-clone handle to the live mirror read path.
    pub fn live(&self) -> LiveConfig {
        self.live.clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Copy the default template onto the config path, with fresh random
    /// values for the schedule pairs and the API key.
    ///
    /// Overwrites any existing file. The randomized document is persisted in
    /// one atomic step, so a failure leaves no file (or the previous file)
    /// rather than a half-written one. Does NOT refresh the mirror; call
    /// [`refresh`](Self::refresh) when the mirror should pick the file up.
    pub fn initialize(&self) -> ConfigResult<()> {
        self.initialize_with_rng(&mut rand::rng())
    }

    /// [`initialize`](Self::initialize) with a caller-supplied random source,
    /// so tests can drive the generated values with a seeded rng.
    pub fn initialize_with_rng<R: Rng>(&self, rng: &mut R) -> ConfigResult<()> {
        let _guard = self.file_lock.lock().unwrap();

        let mut doc = self.read_template()?;
        defaults::apply(&mut doc, rng)?;
        self.persist(&doc)?;

        tracing::info!("Initialized config at {}", self.config_path);
        Ok(())
    }

    /// Replace whole sections of the on-disk document.
    ///
    /// For every section named in `sections`, the prior key map is discarded
    /// entirely and the supplied one installed - keys absent from the input
    /// are gone afterwards. Sections not named are untouched; a named section
    /// missing from the document is created. On success the mirror is fully
    /// refreshed, so the write is immediately visible to readers.
    pub fn write_sections(
        &self,
        sections: IndexMap<String, IndexMap<String, String>>,
    ) -> ConfigResult<()> {
        let _guard = self.file_lock.lock().unwrap();

        let mut doc = self.read_document()?;
        let names: Vec<String> = sections.keys().cloned().collect();
        for (name, keys) in sections {
            doc.replace_section(&name, keys)?;
        }
        self.persist(&doc)?;
        self.metrics.record_section_write();
        tracing::debug!("Rewrote sections {:?} in {}", names, self.config_path);
        self.live.emit(ConfigChange::SectionsWritten { sections: names });

        self.refresh_locked()
    }

    /// Insert or overwrite a single key in an existing section.
    ///
    /// The value is coerced to its string form before writing. Fails with
    /// [`ConfigError::UnknownSection`] if the document has no such section;
    /// callers create sections via `write_sections` or `initialize`. On
    /// success both the file and the single mirror entry are updated - a
    /// targeted sync, not a full refresh.
    pub fn write_key(&self, section: &str, key: &str, value: impl Display) -> ConfigResult<()> {
        let value = value.to_string();
        // The document stores the trimmed on-disk form; mirror the same form.
        let value = value.trim();
        let _guard = self.file_lock.lock().unwrap();

        let mut doc = self.read_document()?;
        doc.set_key(section, key, value)?;
        self.persist(&doc)?;

        self.live.set_entry(section, key, value);
        self.metrics.record_key_write();
        tracing::debug!("Wrote [{}] {} in {}", section, key, self.config_path);
        self.live.emit(ConfigChange::KeyWritten {
            section: section.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }

    /// Bring the on-disk document up to date with a newer default template.
    ///
    /// The template is loaded first and the existing document laid over it:
    /// user values win for shared keys, template-only keys are added with
    /// template values, and user-only keys and sections are preserved as-is.
    /// Idempotent. Does not refresh the mirror.
    pub fn merge_defaults(&self) -> ConfigResult<()> {
        let _guard = self.file_lock.lock().unwrap();

        let template = self.read_template()?;
        let user = self.read_document()?;
        let merged = ConfigDocument::layered(&template, &user);
        self.persist(&merged)?;

        self.metrics.record_merge();
        tracing::info!("Merged template defaults into {}", self.config_path);
        Ok(())
    }

    /// Rebuild the live mirror from the on-disk document.
    ///
    /// The whole snapshot is swapped atomically: concurrent readers see
    /// either the fully-old or the fully-new mapping. If the document fails
    /// to parse, the prior snapshot is left fully intact.
    pub fn refresh(&self) -> ConfigResult<()> {
        let _guard = self.file_lock.lock().unwrap();
        self.refresh_locked()
    }

    /// Make a fresh or upgraded deployment ready in one call: initialize the
    /// file if it does not exist, otherwise merge new template defaults into
    /// it, then refresh the mirror.
    pub fn ensure_ready(&self) -> ConfigResult<()> {
        if self.config_path.exists() {
            self.merge_defaults()?;
        } else {
            self.initialize()?;
        }
        self.refresh()
    }

    // Body of refresh, for callers already holding the file lock.
    fn refresh_locked(&self) -> ConfigResult<()> {
        let doc = match self.read_document() {
            Ok(doc) => doc,
            Err(e) => {
                self.metrics.record_refresh_failure();
                return Err(e);
            }
        };
        self.live.replace(live::snapshot_from(&doc));
        self.metrics.record_refresh();
        tracing::debug!("Refreshed mirror from {}", self.config_path);
        self.live.emit(ConfigChange::Refreshed);
        Ok(())
    }

    fn read_document(&self) -> ConfigResult<ConfigDocument> {
        let text = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::io(&self.config_path, e))?;
        ConfigDocument::parse(&text, &self.config_path)
    }

    fn read_template(&self) -> ConfigResult<ConfigDocument> {
        let text = fs::read_to_string(&self.template_path)
            .map_err(|e| ConfigError::io(&self.template_path, e))?;
        ConfigDocument::parse(&text, &self.template_path)
    }

    /// Persist the document atomically: write to a temp file in the same
    /// directory, sync, then rename over the config path.
    fn persist(&self, doc: &ConfigDocument) -> ConfigResult<()> {
        let temp_path = Utf8PathBuf::from(format!("{}.tmp", self.config_path));
        let io_err = |e| ConfigError::io(&self.config_path, e);

        {
            let mut file = fs::File::create(&temp_path).map_err(io_err)?;
            file.write_all(doc.render().as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&temp_path, &self.config_path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = "\
[Server]
apikey =
installupdatehr = 00
installupdatemin = 00

[Search]
searchtimehr = 00
searchtimemin = 00
waitdays = 1
";

    fn create_test_store() -> (ConfigStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let template_path = dir.join("base_config.cfg");
        fs::write(&template_path, TEMPLATE).unwrap();
        let store = ConfigStore::new(dir.join("config.cfg"), template_path);
        (store, temp_dir)
    }

    #[test]
    fn test_initialize_creates_file_from_template() {
        let (store, _temp_dir) = create_test_store();

        store.initialize().unwrap();

        assert!(store.config_path().exists());
        let doc = store.read_document().unwrap();
        assert_eq!(doc.get("Search", "waitdays"), Some("1"));
        assert_eq!(doc.get("Server", "apikey").unwrap().len(), 32);
    }

    #[test]
    fn test_initialize_missing_template_leaves_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let store = ConfigStore::new(dir.join("config.cfg"), dir.join("missing.cfg"));

        let err = store.initialize().unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(!store.config_path().exists());
    }

    #[test]
    fn test_initialize_does_not_refresh_mirror() {
        let (store, _temp_dir) = create_test_store();

        store.initialize().unwrap();

        assert!(store.live().get("Search", "waitdays").is_none());
        store.refresh().unwrap();
        assert!(store.live().get("Search", "waitdays").is_some());
    }

    #[test]
    fn test_persist_leaves_no_temp_file() {
        let (store, _temp_dir) = create_test_store();
        store.initialize().unwrap();

        let temp_path = Utf8PathBuf::from(format!("{}.tmp", store.config_path()));
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_ensure_ready_fresh_then_upgraded() {
        let (store, _temp_dir) = create_test_store();

        // Fresh deployment: file created and mirrored.
        store.ensure_ready().unwrap();
        assert!(store.live().get("Search", "waitdays").is_some());

        // "Upgrade" the template, run again: new key merged in, user value kept.
        store.write_key("Search", "waitdays", 3).unwrap();
        fs::write(
            &store.template_path,
            format!("{TEMPLATE}newkey = fresh\n"),
        )
        .unwrap();
        store.ensure_ready().unwrap();

        let live = store.live();
        assert_eq!(
            live.get("Search", "waitdays"),
            Some(crate::ConfigValue::Plain("3".to_string()))
        );
        assert_eq!(
            live.get("Search", "newkey"),
            Some(crate::ConfigValue::Plain("fresh".to_string()))
        );
    }

    #[test]
    fn test_write_key_coerces_display_values() {
        let (store, _temp_dir) = create_test_store();
        store.initialize().unwrap();

        store.write_key("Search", "waitdays", 7).unwrap();

        let doc = store.read_document().unwrap();
        assert_eq!(doc.get("Search", "waitdays"), Some("7"));
    }

    #[test]
    fn test_write_key_rejects_keys_that_break_the_codec() {
        let (store, _temp_dir) = create_test_store();
        store.initialize().unwrap();
        store.refresh().unwrap();
        let before = fs::read_to_string(store.config_path()).unwrap();

        // A comment-leading key would vanish on the next parse; a
        // bracket-leading key would render an unparseable header line.
        for key in ["#note", "[weird"] {
            let err = store.write_key("Search", key, "kept").unwrap_err();
            assert!(matches!(err, ConfigError::Syntax { .. }), "key {key:?}");
        }

        assert_eq!(fs::read_to_string(store.config_path()).unwrap(), before);
        store.refresh().unwrap();
        assert!(store.live().get("Search", "#note").is_none());
    }

    #[test]
    fn test_write_key_padded_value_mirror_matches_file() {
        let (store, _temp_dir) = create_test_store();
        store.initialize().unwrap();
        store.refresh().unwrap();

        store.write_key("Search", "waitdays", " 3 ").unwrap();
        let before_refresh = store.live().get("Search", "waitdays");

        store.refresh().unwrap();

        assert_eq!(before_refresh, store.live().get("Search", "waitdays"));
        assert_eq!(
            before_refresh,
            Some(crate::ConfigValue::Plain("3".to_string()))
        );
    }

    #[test]
    fn test_write_key_unknown_section_no_mutation() {
        let (store, _temp_dir) = create_test_store();
        store.initialize().unwrap();
        let before = fs::read_to_string(store.config_path()).unwrap();

        let err = store.write_key("Nope", "a", "1").unwrap_err();

        assert!(matches!(err, ConfigError::UnknownSection(_)));
        assert_eq!(fs::read_to_string(store.config_path()).unwrap(), before);
    }
}
