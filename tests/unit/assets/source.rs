use super::*;

struct StaticFetcher(Vec<u8>);

impl RemoteFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> BadgeResult<Vec<u8>> {
        if url.ends_with("/missing.png") {
            return Err(BadgeError::image_load("404"));
        }
        Ok(self.0.clone())
    }
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("badgekit-source-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn parse_base64_data_uri() {
    let src = ImageSource::Inline {
        mime: "image/png".to_owned(),
        bytes: b"hello".to_vec(),
    };
    assert_eq!(parse_source("data:image/png;base64,aGVsbG8=").unwrap(), src);
}

#[test]
fn parse_percent_encoded_data_uri() {
    let got = parse_source("data:image/svg+xml,%3Csvg%3E").unwrap();
    assert_eq!(
        got,
        ImageSource::Inline {
            mime: "image/svg+xml".to_owned(),
            bytes: b"<svg>".to_vec(),
        }
    );
    assert!(parse_source("data:text/plain,%G1").is_err());
    assert!(parse_source("data:image/png;base64").is_err());
}

#[test]
fn parse_remote_and_paths() {
    assert_eq!(
        parse_source("HTTPS://cdn.example.com/a.png").unwrap(),
        ImageSource::Remote("HTTPS://cdn.example.com/a.png".to_owned())
    );
    assert_eq!(
        parse_source(" /img/./logo.png ").unwrap(),
        ImageSource::Path("img/logo.png".to_owned())
    );
    assert!(matches!(
        parse_source("   ").unwrap_err(),
        BadgeError::ImageLoad(_)
    ));
}

#[test]
fn normalize_rel_path_rules() {
    assert_eq!(normalize_rel_path("a\\b\\c.png").unwrap(), "a/b/c.png");
    assert_eq!(normalize_rel_path("//a//b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("../secret.png").is_err());
    assert!(normalize_rel_path("a/../../b.png").is_err());
    assert!(normalize_rel_path("./.").is_err());
    assert!(normalize_rel_path("").is_err());
}

#[test]
fn resolver_reads_relative_paths_under_root() {
    let dir = temp_dir("read");
    std::fs::create_dir_all(dir.join("img")).unwrap();
    std::fs::write(dir.join("img/logo.bin"), b"abc").unwrap();

    let r = SourceResolver::new(&dir);
    assert_eq!(r.assets_root(), dir.as_path());
    assert_eq!(r.read("img/logo.bin").unwrap(), b"abc");
    assert_eq!(r.read("/img/logo.bin").unwrap(), b"abc");
    assert!(matches!(
        r.read("img/nope.bin").unwrap_err(),
        BadgeError::ImageLoad(_)
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn resolver_remote_needs_fetcher() {
    let r = SourceResolver::new(".");
    assert!(matches!(
        r.read("https://example.com/a.png").unwrap_err(),
        BadgeError::ImageLoad(_)
    ));

    let r = r.with_fetcher(Arc::new(StaticFetcher(b"png".to_vec())));
    assert_eq!(r.read("https://example.com/a.png").unwrap(), b"png");
    assert!(r.read("https://example.com/missing.png").is_err());
    assert!(format!("{r:?}").contains("has_fetcher: true"));
}
