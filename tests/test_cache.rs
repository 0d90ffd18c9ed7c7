use std::sync::Arc;

use bytes::Bytes;
use tempfile::TempDir;

use nvhttpd::cache::mime::mime_for_path;
use nvhttpd::cache::{path_hash, ContentCache, Entry, Snapshot};

fn entry(path: &str, body: &str) -> Entry {
    Entry {
        path: path.to_string(),
        hash: path_hash(path),
        body: Bytes::from(body.to_string()),
        mime: mime_for_path(path),
    }
}

#[test]
fn test_hash_of_empty_path_is_zero() {
    assert_eq!(path_hash(""), 0);
}

#[test]
fn test_hash_appends_one_byte_at_a_time() {
    let mut expected = 0u64;
    let path = "/error/404/index.html";
    for (i, b) in path.bytes().enumerate() {
        expected = expected.wrapping_mul(31).wrapping_add(u64::from(b));
        assert_eq!(path_hash(&path[..=i]), expected);
    }
}

#[test]
fn test_hash_wraps_on_long_input() {
    let long = "x".repeat(4096);
    // No panic in debug builds; just a stable value.
    assert_eq!(path_hash(&long), path_hash(&long));
}

#[test]
fn test_mime_table() {
    let table = [
        ("style.css", "text/css"),
        (
            "report.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        ("index.html", "text/html; charset=UTF-8"),
        ("favicon.ico", "image/x-icon"),
        ("photo.jpg", "image/jpeg"),
        ("photo.jpeg", "image/jpeg"),
        ("app.js", "application/javascript"),
        ("readme.md", "text/markdown"),
        ("logo.png", "image/png"),
        ("icon.svg", "image/svg+xml"),
        ("site.webmanifest", "application/manifest+json"),
        ("feed.xml", "text/xml"),
    ];
    for (path, mime) in table {
        assert_eq!(mime_for_path(path), mime, "extension of {path}");
    }
}

#[test]
fn test_mime_is_case_insensitive() {
    assert_eq!(mime_for_path("INDEX.HTML"), "text/html; charset=UTF-8");
    assert_eq!(mime_for_path("photo.JpEg"), "image/jpeg");
    assert_eq!(mime_for_path("style.CSS"), "text/css");
}

#[test]
fn test_mime_defaults_to_octet_stream() {
    assert_eq!(mime_for_path("archive.tar.gz"), "application/octet-stream");
    assert_eq!(mime_for_path("LICENSE"), "application/octet-stream");
    assert_eq!(mime_for_path("trailing-dot."), "application/octet-stream");
}

#[test]
fn test_snapshot_capacity_is_power_of_two_above_count() {
    for n in [0usize, 1, 2, 3, 4, 7, 8, 9, 100] {
        let entries = (0..n).map(|i| entry(&format!("/f{i}.html"), "x")).collect();
        let snapshot = Snapshot::build(entries);
        assert_eq!(snapshot.len(), n);
        assert!(snapshot.capacity().is_power_of_two());
        assert!(snapshot.capacity() > snapshot.len());
    }
}

#[test]
fn test_snapshot_lookup_hits_and_misses() {
    let entries = vec![
        entry("/index.html", "home"),
        entry("/a/b.css", "css"),
        entry("/a/c.js", "js"),
    ];
    let snapshot = Snapshot::build(entries);

    let hit = snapshot.get("/a/b.css").unwrap();
    assert_eq!(hit.body, Bytes::from("css"));
    assert_eq!(hit.mime, "text/css");
    assert_eq!(hit.hash, path_hash("/a/b.css"));
    assert_eq!(hit.len(), 3);

    assert!(snapshot.get("/a/b.cs").is_none());
    assert!(snapshot.get("/missing").is_none());
}

#[test]
fn test_snapshot_paths_are_unique() {
    let entries = (0..50)
        .map(|i| entry(&format!("/page{i}.html"), "body"))
        .collect();
    let snapshot = Snapshot::build(entries);

    let mut paths: Vec<&str> = snapshot.entries().map(|e| e.path.as_str()).collect();
    paths.sort_unstable();
    let before = paths.len();
    paths.dedup();
    assert_eq!(paths.len(), before);
}

#[test]
fn test_snapshot_duplicate_path_replaces_in_place() {
    let entries = vec![
        entry("/index.html", "first"),
        entry("/other.html", "other"),
        entry("/index.html", "second"),
    ];
    let snapshot = Snapshot::build(entries);
    assert_eq!(snapshot.len(), 2);
    assert_eq!(
        snapshot.get("/index.html").unwrap().body,
        Bytes::from("second")
    );
}

#[test]
fn test_snapshot_entry_metadata_is_consistent() {
    let entries = vec![entry("/x.md", "markdown body"), entry("/y.png", "png")];
    let snapshot = Snapshot::build(entries);
    for e in snapshot.entries() {
        assert_eq!(e.len(), e.body.len());
        assert_eq!(e.hash, path_hash(&e.path));
    }
}

fn populate(dir: &TempDir) {
    std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
    std::fs::write(dir.path().join(".hidden"), "secret").unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs").join("guide.md"), "# guide").unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".git").join("config"), "ref").unwrap();
}

#[tokio::test]
async fn test_load_walks_tree_and_strips_root_prefix() {
    let dir = TempDir::new().unwrap();
    populate(&dir);

    let cache = ContentCache::new();
    let count = cache.load(dir.path()).await.unwrap();
    assert_eq!(count, 2);

    let index = cache.find("/index.html").await.unwrap();
    assert_eq!(index.body, Bytes::from("<html></html>"));
    assert_eq!(index.mime, "text/html; charset=UTF-8");

    let guide = cache.find("/docs/guide.md").await.unwrap();
    assert_eq!(guide.mime, "text/markdown");
    assert_eq!(guide.body, Bytes::from("# guide"));
}

#[tokio::test]
async fn test_load_skips_dot_files_and_dot_directories() {
    let dir = TempDir::new().unwrap();
    populate(&dir);

    let cache = ContentCache::new();
    cache.load(dir.path()).await.unwrap();
    assert!(cache.find("/.hidden").await.is_none());
    assert!(cache.find("/.git/config").await.is_none());
}

#[tokio::test]
async fn test_find_misses_before_first_load() {
    let cache = ContentCache::new();
    assert!(cache.find("/index.html").await.is_none());
}

#[tokio::test]
async fn test_failed_load_preserves_published_snapshot() {
    let dir = TempDir::new().unwrap();
    populate(&dir);

    let cache = ContentCache::new();
    cache.load(dir.path()).await.unwrap();

    let missing = dir.path().join("no-such-root");
    assert!(cache.load(&missing).await.is_err());
    assert!(cache.find("/index.html").await.is_some());
}

#[tokio::test]
async fn test_reload_publishes_new_tree() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.html"), "old").unwrap();

    let cache = ContentCache::new();
    cache.load(dir.path()).await.unwrap();
    assert_eq!(cache.find("/a.html").await.unwrap().body, Bytes::from("old"));

    std::fs::write(dir.path().join("a.html"), "new contents").unwrap();
    std::fs::write(dir.path().join("b.html"), "added").unwrap();
    cache.load(dir.path()).await.unwrap();

    assert_eq!(
        cache.find("/a.html").await.unwrap().body,
        Bytes::from("new contents")
    );
    assert!(cache.find("/b.html").await.is_some());
}

#[tokio::test]
async fn test_entry_copy_outlives_reload() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.html"), "old").unwrap();

    let cache = ContentCache::new();
    cache.load(dir.path()).await.unwrap();
    let held = cache.find("/a.html").await.unwrap();

    std::fs::write(dir.path().join("a.html"), "new").unwrap();
    cache.load(dir.path()).await.unwrap();

    assert_eq!(held.body, Bytes::from("old"));
}

#[tokio::test]
async fn test_concurrent_finds_during_reloads_see_consistent_entries() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("page.html"), "generation-0").unwrap();

    let cache = Arc::new(ContentCache::new());
    cache.load(dir.path()).await.unwrap();

    let mut readers = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let found = cache.find("/page.html").await.unwrap();
                let text = std::str::from_utf8(&found.body).unwrap();
                assert!(text.starts_with("generation-"), "torn entry: {text:?}");
                assert_eq!(found.hash, path_hash("/page.html"));
            }
        }));
    }

    for generation in 1..5 {
        std::fs::write(
            dir.path().join("page.html"),
            format!("generation-{generation}"),
        )
        .unwrap();
        cache.load(dir.path()).await.unwrap();
    }

    for reader in readers {
        reader.await.unwrap();
    }
}
