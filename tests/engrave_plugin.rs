use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;

use engrave::{
    ContentItem, EngraveConfig, EngravePlugin, Lifecycle, Page, Plugin, Settings, encode,
};

fn settings(site_url: Option<&str>, output: &Path) -> HashMap<String, String> {
    let mut settings = HashMap::new();
    if let Some(url) = site_url {
        settings.insert("SITEURL".to_string(), url.to_string());
    }
    settings.insert(
        "OUTPUT_PATH".to_string(),
        output.to_string_lossy().into_owned(),
    );
    settings
}

fn engrave_dir(output: &Path) -> PathBuf {
    output.join("images").join("engrave")
}

/// Simulate codes left behind by a previous build.
fn setup_previous_codes(output: &Path, count: usize) {
    let dir = engrave_dir(output);
    fs::create_dir_all(&dir).unwrap();
    for i in 0..count {
        fs::write(dir.join(format!("dummy_{i}.svg")), "Dummy QR code content").unwrap();
    }
}

fn svg_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "svg"))
        .collect();
    files.sort();
    files
}

fn article() -> Page {
    Page::new("test-article", "test-article.html", "<p>Test content</p>")
}

/// Shared sink for formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a thread-local subscriber and return everything it logged.
fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn build_cleans_previous_run_and_engraves_articles() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output");
    setup_previous_codes(&output, 5);
    assert_eq!(svg_files(&engrave_dir(&output)).len(), 5);

    let mut lifecycle = Lifecycle::new();
    engrave::register(&mut lifecycle);

    let mut pages = vec![article()];
    lifecycle.run(&settings(Some("https://example.com"), &output), pages.iter_mut());

    let files = svg_files(&engrave_dir(&output));
    assert_eq!(files, vec![engrave_dir(&output).join("test-article_qrcode.svg")]);
    assert!(fs::metadata(&files[0]).unwrap().len() > 0);

    assert_eq!(
        pages[0].engrave_qrcode.as_deref(),
        Some("https://example.com/images/engrave/test-article_qrcode.svg")
    );
}

#[test]
fn engraved_file_decodes_to_page_url() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output");

    let mut plugin = EngravePlugin::new(EngraveConfig {
        allowed_schemes: vec!["http".to_string(), "https".to_string()],
        ..EngraveConfig::default()
    });
    plugin.on_build_start(&settings(Some("http://example.com/"), &output));

    let mut page = article();
    plugin.on_item_ready(&mut page);

    let url = "http://example.com/test-article.html";
    let svg = fs::read(engrave_dir(&output).join("test-article_qrcode.svg")).unwrap();
    let expected = encode(url, ["http"]).unwrap();
    assert_eq!(svg, expected.as_bytes());
    assert_eq!(expected.decode().unwrap(), url);
    assert_eq!(plugin.report().generated, 1);
}

#[test]
fn cleanup_keeps_directory() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output");
    let stale = engrave_dir(&output).join("old_file.svg");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "Old content").unwrap();

    let mut config = EngraveConfig::default();
    config.output_path = output.clone();
    EngravePlugin::new(config).cleanup_directory().unwrap();

    assert!(!stale.exists(), "old file should be removed after cleanup");
    assert!(engrave_dir(&output).is_dir(), "directory should still exist");
}

#[test]
fn missing_site_url_creates_nothing() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output");

    let mut plugin = EngravePlugin::default();
    plugin.on_build_start(&settings(None, &output));

    let mut page = article();
    plugin.on_item_ready(&mut page);

    assert!(!engrave_dir(&output).exists(), "engrave directory shouldn't be created");
    assert!(page.engrave_qrcode.is_none());
    assert_eq!(plugin.report().generated, 0);
    assert_eq!(plugin.report().skipped, 1);
}

#[test]
fn rejected_urls_do_not_stop_the_build() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output");

    let mut lifecycle = Lifecycle::new();
    engrave::register(&mut lifecycle);

    // Only https is allowed by default, so the whole site is rejected.
    let mut pages = vec![article(), Page::new("second", "second.html", "<p>2</p>")];
    lifecycle.run(&settings(Some("http://example.com"), &output), pages.iter_mut());

    assert!(pages.iter().all(|p| p.engrave_qrcode.is_none()));
    assert!(!engrave_dir(&output).exists());
}

#[test]
fn pages_without_content_or_url_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output");

    let mut plugin = EngravePlugin::default();
    plugin.on_build_start(&settings(Some("https://example.com"), &output));

    let mut no_url = Page {
        url: None,
        ..article()
    };
    let mut no_content = Page {
        content: None,
        ..article()
    };
    let mut unsafe_slug = Page::new("../escape", "escape.html", "<p></p>");
    plugin.on_item_ready(&mut no_url);
    plugin.on_item_ready(&mut no_content);
    plugin.on_item_ready(&mut unsafe_slug);

    assert_eq!(plugin.report().skipped, 3);
    assert!(!engrave_dir(&output).exists());
    assert!(!tmp.path().join("escape_qrcode.svg").exists());
}

#[test]
fn json_settings_and_embedding() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("public");
    let settings = json!({
        "SITEURL": "https://example.com",
        "OUTPUT_PATH": output.to_string_lossy(),
        "ENGRAVE_IMAGE_DIR": "static",
        "ENGRAVE_BASE_DIR": "qr",
        "ENGRAVE_EMBED": "true",
    });
    assert_eq!(settings.get_str("ENGRAVE_BASE_DIR"), Some("qr"));

    let mut plugin = EngravePlugin::default();
    plugin.on_build_start(&settings);

    let mut page = article();
    plugin.on_item_ready(&mut page);

    let expected = "https://example.com/static/qr/test-article_qrcode.svg";
    assert!(output.join("static/qr/test-article_qrcode.svg").is_file());
    assert_eq!(page.engrave_qrcode.as_deref(), Some(expected));
    let content = page.content.as_deref().unwrap();
    assert!(content.starts_with("<p>Test content</p>"));
    assert!(content.contains(&format!("src=\"{expected}\"")));
    assert_eq!(page.slug(), "test-article");
}

#[test]
fn missing_site_url_is_logged_once() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output");

    let logs = capture_logs(|| {
        let mut lifecycle = Lifecycle::new();
        engrave::register(&mut lifecycle);
        let mut pages = vec![article(), Page::new("second", "second.html", "<p>2</p>")];
        lifecycle.run(&settings(None, &output), pages.iter_mut());
    });

    assert_eq!(
        logs.matches("SITEURL is not set; QR codes will not be generated")
            .count(),
        1,
        "{logs}"
    );
    assert!(logs.contains("WARN"), "{logs}");
    assert!(!logs.contains("No QR code was generated"), "{logs}");
}

#[test]
fn rejected_page_url_is_logged_with_slug() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output");

    let logs = capture_logs(|| {
        let mut plugin = EngravePlugin::default();
        plugin.on_build_start(&settings(Some("http://example.com"), &output));
        plugin.on_item_ready(&mut article());
    });

    assert!(
        logs.contains("No QR code was generated for page test-article"),
        "{logs}"
    );
    assert!(logs.contains("Could not generate QR code"), "{logs}");
    assert!(logs.contains("scheme"), "{logs}");
}
