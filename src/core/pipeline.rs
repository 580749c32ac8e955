use crate::core::extra::ProjectExtraService;
use crate::core::integrity::{check_integrity, summarize, IntegrityReport};
use crate::core::{ConfigProvider, GeneratedExtra, Pipeline, SourceDefinition, Storage};
use crate::domain::definition::ProjectDefinition;
use crate::utils::error::{ExtraError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const MANIFEST_FILENAME: &str = "manifest.json";
const OUTPUT_SUFFIX: &str = ".extra.json";

/// Reads definitions from `input`, writes extra structures to `output`.
pub struct ExtraPipeline<S: Storage, C: ConfigProvider> {
    input: S,
    output: S,
    config: C,
    service: ProjectExtraService,
}

#[derive(Debug, Serialize)]
struct BundleManifest {
    generated_at: String,
    projects: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
struct ManifestEntry {
    project_ref: String,
    slug: String,
    source: String,
    file: String,
    forms: usize,
    inputs: usize,
}

impl<S: Storage, C: ConfigProvider> ExtraPipeline<S, C> {
    pub fn new(input: S, output: S, config: C) -> Self {
        let service = ProjectExtraService::new(config.options().clone());
        Self {
            input,
            output,
            config,
            service,
        }
    }

    async fn definition_files(&self) -> Result<Vec<String>> {
        if !self.config.input_files().is_empty() {
            return Ok(self.config.input_files().to_vec());
        }

        let files = self.input.list_files("", "json").await?;
        Ok(files
            .into_iter()
            .filter(|f| is_definition_file(f))
            .collect())
    }

    fn encode(&self, generated: &GeneratedExtra) -> Result<Vec<u8>> {
        let bytes = if self.config.pretty() {
            serde_json::to_vec_pretty(&generated.extra)?
        } else {
            serde_json::to_vec(&generated.extra)?
        };
        Ok(bytes)
    }

    fn bundle(&self, files: &[(String, Vec<u8>)], manifest: &BundleManifest) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        for (name, data) in files {
            zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
            zip.write_all(data)?;
        }

        zip.start_file::<_, ()>(MANIFEST_FILENAME, FileOptions::default())?;
        zip.write_all(serde_json::to_string_pretty(manifest)?.as_bytes())?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn output_location(&self, filename: &str) -> String {
        format!("{}/{}", self.config.output_path().trim_end_matches('/'), filename)
    }
}

/// Skips files this tool writes itself, so input and output may share a directory.
fn is_definition_file(path: &str) -> bool {
    !path.ends_with(OUTPUT_SUFFIX) && !path.ends_with(MANIFEST_FILENAME)
}

/// Persisted `*.extra.json` files under `dir`, sorted.
pub async fn list_extra_files<S: Storage>(storage: &S, dir: &str) -> Result<Vec<String>> {
    let files = storage.list_files(dir, "json").await?;
    Ok(files
        .into_iter()
        .filter(|f| f.ends_with(OUTPUT_SUFFIX))
        .collect())
}

/// Reads persisted extra structures back and checks their references.
pub async fn check_persisted<S: Storage>(
    storage: &S,
    files: &[String],
) -> Result<Vec<(String, IntegrityReport)>> {
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let data = storage.read_file(file).await?;
        let extra: crate::domain::model::ProjectExtra = serde_json::from_slice(&data)?;
        let report = check_integrity(&extra);
        tracing::debug!("Checked {}: {} violation(s)", file, report.len());
        reports.push((file.clone(), report));
    }
    Ok(reports)
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ExtraPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<SourceDefinition>> {
        let files = self.definition_files().await?;
        if files.is_empty() {
            tracing::warn!("No project definitions found");
        }

        let mut definitions = Vec::with_capacity(files.len());
        for file in files {
            tracing::debug!("Reading definition: {}", file);
            let data = self.input.read_file(&file).await?;
            let value: serde_json::Value = serde_json::from_slice(&data).map_err(|e| {
                tracing::error!("❌ {} is not valid JSON: {}", file, e);
                ExtraError::SerializationError(e)
            })?;
            let definition = ProjectDefinition::parse(&value, &self.config.options().input_types)
                .map_err(|e| {
                    tracing::error!("❌ {} is not a valid project definition: {}", file, e);
                    e
                })?;

            tracing::debug!(
                "Parsed project {} ({} form(s))",
                definition.project.slug,
                definition.forms().len()
            );
            definitions.push(SourceDefinition {
                source: file,
                definition,
            });
        }

        Ok(definitions)
    }

    async fn transform(&self, data: Vec<SourceDefinition>) -> Result<Vec<GeneratedExtra>> {
        let mut generated: Vec<GeneratedExtra> = Vec::with_capacity(data.len());
        let mut slugs: HashMap<String, usize> = HashMap::new();

        for SourceDefinition { source, definition } in data {
            let extra = self.service.generate(&definition);
            let summary = summarize(&extra);
            let report = check_integrity(&extra);

            for form in &summary {
                tracing::info!("  {}", form);
            }

            if !report.is_ok() {
                for violation in &report.violations {
                    tracing::warn!("⚠️ {}: {}", source, violation);
                }
                if self.config.strict() {
                    return Err(ExtraError::IntegrityError {
                        form_ref: report.first_form().unwrap_or_default().to_string(),
                        violations: report.len(),
                    });
                }
            }

            let item = GeneratedExtra {
                source,
                extra,
                summary,
                report,
            };
            let slug = item.extra.details().slug.clone();

            match slugs.get(&slug) {
                Some(&earlier) if self.config.strict() => {
                    return Err(ExtraError::invalid(
                        item.source,
                        "project.slug",
                        format!("'{}' is also the slug of {}", slug, generated[earlier].source),
                    ));
                }
                Some(&earlier) => {
                    tracing::warn!(
                        "⚠️ Slug '{}' from {} replaces the output of {}",
                        slug,
                        item.source,
                        generated[earlier].source
                    );
                    generated[earlier] = item;
                }
                None => {
                    slugs.insert(slug, generated.len());
                    generated.push(item);
                }
            }
        }

        Ok(generated)
    }

    async fn load(&self, result: Vec<GeneratedExtra>) -> Result<Vec<String>> {
        let mut written = Vec::new();
        let mut files = Vec::with_capacity(result.len());
        let mut entries = Vec::with_capacity(result.len());

        for generated in &result {
            let filename = generated.output_filename();
            let data = self.encode(generated)?;

            tracing::debug!("Writing {} ({} bytes)", filename, data.len());
            self.output.write_file(&filename, &data).await?;

            let details = generated.extra.details();
            let entry = ManifestEntry {
                project_ref: details.project_ref.clone(),
                slug: details.slug.clone(),
                source: generated.source.clone(),
                file: filename.clone(),
                forms: generated.extra.forms.len(),
                inputs: generated.extra.inputs.len(),
            };

            // The bundle mirrors the directory: a rewritten file keeps only its last content.
            match files.iter().position(|(name, _)| *name == filename) {
                Some(i) => {
                    files[i].1 = data;
                    entries[i] = entry;
                }
                None => {
                    written.push(self.output_location(&filename));
                    files.push((filename, data));
                    entries.push(entry);
                }
            }
        }

        if let Some(bundle_filename) = self.config.bundle_filename() {
            let manifest = BundleManifest {
                generated_at: chrono::Utc::now().to_rfc3339(),
                projects: entries,
            };
            let zip_data = self.bundle(&files, &manifest)?;

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.output.write_file(bundle_filename, &zip_data).await?;
            written.push(self.output_location(bundle_filename));
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extra::ExtraOptions;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put_json(&self, path: &str, value: serde_json::Value) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), serde_json::to_vec(&value).unwrap());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ExtraError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn list_files(&self, _dir: &str, extension: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let suffix = format!(".{}", extension);
            let mut names: Vec<String> = files
                .keys()
                .filter(|k| k.ends_with(&suffix))
                .cloned()
                .collect();
            names.sort();
            Ok(names)
        }
    }

    struct MockConfig {
        input_files: Vec<String>,
        options: ExtraOptions,
        bundle_filename: Option<String>,
        strict: bool,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                input_files: vec![],
                options: ExtraOptions::default(),
                bundle_filename: None,
                strict: true,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_files(&self) -> &[String] {
            &self.input_files
        }

        fn output_path(&self) -> &str {
            "out"
        }

        fn options(&self) -> &ExtraOptions {
            &self.options
        }

        fn bundle_filename(&self) -> Option<&str> {
            self.bundle_filename.as_deref()
        }

        fn pretty(&self) -> bool {
            false
        }

        fn strict(&self) -> bool {
            self.strict
        }
    }

    fn definition(slug: &str) -> serde_json::Value {
        json!({
            "id": slug,
            "type": "project",
            "project": {
                "ref": format!("{}_ref", slug),
                "name": slug,
                "slug": slug,
                "forms": [{ "ref": "f1", "name": "F1", "slug": "f1", "inputs": [
                    { "ref": "q1", "type": "location", "question": "Where" }
                ]}]
            }
        })
    }

    #[tokio::test]
    async fn test_extract_skips_generated_files() {
        let input = MockStorage::new();
        input.put_json("b.json", definition("beta")).await;
        input.put_json("a.json", definition("alpha")).await;
        input.put_json("alpha.extra.json", json!({})).await;
        input.put_json("manifest.json", json!({})).await;

        let pipeline = ExtraPipeline::new(input, MockStorage::new(), MockConfig::new());
        let defs = pipeline.extract().await.unwrap();

        let sources: Vec<_> = defs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["a.json", "b.json"]);
        assert_eq!(defs[0].definition.project.slug, "alpha");
    }

    #[tokio::test]
    async fn test_extract_explicit_files() {
        let input = MockStorage::new();
        input.put_json("a.json", definition("alpha")).await;
        input.put_json("b.json", definition("beta")).await;

        let mut config = MockConfig::new();
        config.input_files = vec!["b.json".to_string()];
        let pipeline = ExtraPipeline::new(input, MockStorage::new(), config);

        let defs = pipeline.extract().await.unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].definition.project.slug, "beta");
    }

    #[tokio::test]
    async fn test_extract_invalid_definition_fails() {
        let input = MockStorage::new();
        input.put_json("broken.json", json!({ "project": { "ref": "x" } })).await;

        let pipeline = ExtraPipeline::new(input, MockStorage::new(), MockConfig::new());
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, ExtraError::MissingFieldError { .. }));
    }

    #[tokio::test]
    async fn test_transform_and_load_writes_extra() {
        let input = MockStorage::new();
        input.put_json("a.json", definition("alpha")).await;
        let output = MockStorage::new();

        let pipeline = ExtraPipeline::new(input, output.clone(), MockConfig::new());
        let defs = pipeline.extract().await.unwrap();
        let generated = pipeline.transform(defs).await.unwrap();
        assert!(generated[0].report.is_ok());
        assert_eq!(generated[0].summary[0].location_inputs, 1);

        let written = pipeline.load(generated).await.unwrap();
        assert_eq!(written, vec!["out/alpha.extra.json"]);

        let data = output.get_file("alpha.extra.json").await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(value["forms"]["f1"]["details"]["has_location"], json!(true));
        assert_eq!(value["project"]["details"]["ref"], json!("alpha_ref"));
    }

    #[tokio::test]
    async fn test_load_bundle_contains_manifest() {
        let input = MockStorage::new();
        input.put_json("a.json", definition("alpha")).await;
        input.put_json("b.json", definition("beta")).await;
        let output = MockStorage::new();

        let mut config = MockConfig::new();
        config.bundle_filename = Some("extra.zip".to_string());
        let pipeline = ExtraPipeline::new(input, output.clone(), config);

        let defs = pipeline.extract().await.unwrap();
        let generated = pipeline.transform(defs).await.unwrap();
        let written = pipeline.load(generated).await.unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[2], "out/extra.zip");

        let zip_data = output.get_file("extra.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 3);

        let mut manifest = String::new();
        std::io::Read::read_to_string(&mut archive.by_name(MANIFEST_FILENAME).unwrap(), &mut manifest)
            .unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(manifest["projects"][1]["file"], json!("beta.extra.json"));
        assert_eq!(manifest["projects"][0]["inputs"], json!(1));
    }

    fn definition_with_ref(slug: &str, project_ref: &str) -> serde_json::Value {
        let mut value = definition(slug);
        value["project"]["ref"] = json!(project_ref);
        value
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_an_error_when_strict() {
        let input = MockStorage::new();
        input.put_json("a.json", definition_with_ref("same", "first")).await;
        input.put_json("b.json", definition_with_ref("same", "second")).await;
        let output = MockStorage::new();

        let mut config = MockConfig::new();
        config.bundle_filename = Some("extra.zip".to_string());
        let pipeline = ExtraPipeline::new(input, output.clone(), config);

        let defs = pipeline.extract().await.unwrap();
        match pipeline.transform(defs).await {
            Err(ExtraError::InvalidFieldError { path, field, reason }) => {
                assert_eq!(path, "b.json");
                assert_eq!(field, "project.slug");
                assert!(reason.contains("a.json"));
            }
            other => panic!("unexpected result: {:?}", other.map(|g| g.len())),
        }
        assert!(output.get_file("same.extra.json").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_keeps_later_project_in_bundle() {
        let input = MockStorage::new();
        input.put_json("a.json", definition_with_ref("same", "first")).await;
        input.put_json("b.json", definition_with_ref("same", "second")).await;
        input.put_json("c.json", definition("other")).await;
        let output = MockStorage::new();

        let mut config = MockConfig::new();
        config.strict = false;
        config.bundle_filename = Some("extra.zip".to_string());
        let pipeline = ExtraPipeline::new(input, output.clone(), config);

        let defs = pipeline.extract().await.unwrap();
        let generated = pipeline.transform(defs).await.unwrap();
        assert_eq!(generated.len(), 2);
        assert_eq!(generated[0].source, "b.json");

        let written = pipeline.load(generated).await.unwrap();
        assert_eq!(
            written,
            vec!["out/same.extra.json", "out/other.extra.json", "out/extra.zip"]
        );

        let on_disk: serde_json::Value =
            serde_json::from_slice(&output.get_file("same.extra.json").await.unwrap()).unwrap();
        assert_eq!(on_disk["project"]["details"]["ref"], json!("second"));

        let zip_data = output.get_file("extra.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 3);

        let mut bundled = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("same.extra.json").unwrap(), &mut bundled)
            .unwrap();
        let bundled: serde_json::Value = serde_json::from_str(&bundled).unwrap();
        assert_eq!(bundled, on_disk);
    }

    #[tokio::test]
    async fn test_load_collapses_repeated_filenames() {
        let input = MockStorage::new();
        input.put_json("a.json", definition_with_ref("same", "first")).await;
        input.put_json("b.json", definition_with_ref("same", "second")).await;
        let output = MockStorage::new();

        let mut config = MockConfig::new();
        config.bundle_filename = Some("extra.zip".to_string());
        let pipeline = ExtraPipeline::new(input, output.clone(), config);

        // bypass transform so load sees both projects
        let defs = pipeline.extract().await.unwrap();
        let generated: Vec<GeneratedExtra> = defs
            .into_iter()
            .map(|d| {
                let extra = pipeline.service.generate(&d.definition);
                GeneratedExtra {
                    source: d.source,
                    summary: summarize(&extra),
                    report: check_integrity(&extra),
                    extra,
                }
            })
            .collect();

        let written = pipeline.load(generated).await.unwrap();
        assert_eq!(written, vec!["out/same.extra.json", "out/extra.zip"]);

        let zip_data = output.get_file("extra.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        let mut manifest = String::new();
        std::io::Read::read_to_string(&mut archive.by_name(MANIFEST_FILENAME).unwrap(), &mut manifest)
            .unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(manifest["projects"].as_array().unwrap().len(), 1);
        assert_eq!(manifest["projects"][0]["project_ref"], json!("second"));
    }

    #[tokio::test]
    async fn test_check_persisted_reads_outputs_back() {
        let input = MockStorage::new();
        input.put_json("a.json", definition("alpha")).await;
        let output = MockStorage::new();

        let pipeline = ExtraPipeline::new(input, output.clone(), MockConfig::new());
        let defs = pipeline.extract().await.unwrap();
        let generated = pipeline.transform(defs).await.unwrap();
        pipeline.load(generated).await.unwrap();

        let mut tampered: serde_json::Value =
            serde_json::from_slice(&output.get_file("alpha.extra.json").await.unwrap()).unwrap();
        tampered["forms"]["f1"]["inputs"] = json!(["q1", "ghost"]);
        output.put_json("tampered.extra.json", tampered).await;

        let files = list_extra_files(&output, "").await.unwrap();
        assert_eq!(files, vec!["alpha.extra.json", "tampered.extra.json"]);

        let reports = check_persisted(&output, &files).await.unwrap();
        assert!(reports[0].1.is_ok());
        assert_eq!(reports[1].1.len(), 1);
    }
}
