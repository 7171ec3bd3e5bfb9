//! Addressing Integration Tests
//!
//! Tests that output names are stable and do not collide in practice.

use std::collections::HashSet;
use std::path::Path;

use opensea_dl::core::{addressed_name, addressed_path, url_digest};

/// Small deterministic generator so the sample is the same on every run
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 16
    }
}

fn sample_urls(count: usize) -> Vec<String> {
    let hosts = [
        "https://lh3.googleusercontent.com",
        "https://openseauserdata.com/files",
        "https://ipfs.io/ipfs",
        "https://i.seadn.io/gae",
    ];
    let mut rng = Lcg(0x5eed);

    (0..count)
        .map(|i| {
            let host = hosts[i % hosts.len()];
            format!("{}/{:x}{:x}/{}.png", host, rng.next(), rng.next(), i)
        })
        .collect()
}

#[test]
fn test_addressing_is_deterministic() {
    for url in sample_urls(1_000) {
        assert_eq!(addressed_name(&url), addressed_name(&url));
        assert_eq!(url_digest(&url).to_string(), addressed_name(&url));
    }
}

#[test]
fn test_addressing_is_stable_across_processes() {
    // Pinned values: a change here would orphan every previously downloaded file
    assert_eq!(addressed_name("a"), "12638187200555641996");
    assert_eq!(
        addressed_name("https://img.example/1.png"),
        "8417320835512563424"
    );
}

#[test]
fn test_no_collisions_across_large_sample() {
    let urls = sample_urls(200_000);
    let unique_urls: HashSet<&String> = urls.iter().collect();
    assert_eq!(unique_urls.len(), urls.len());

    let names: HashSet<String> = urls.iter().map(|u| addressed_name(u)).collect();
    assert_eq!(names.len(), urls.len());
}

#[test]
fn test_near_identical_urls_get_distinct_names() {
    let base = "https://i.seadn.io/gae/abc.png";
    let variants = [
        base.to_string(),
        format!("{}?w=500", base),
        format!("{}?w=500&auto=format", base),
        base.replace("abc", "abd"),
        base.to_uppercase(),
    ];

    let names: HashSet<String> = variants.iter().map(|u| addressed_name(u)).collect();
    assert_eq!(names.len(), variants.len());
}

#[test]
fn test_path_is_under_target() {
    let target = Path::new("downloads/coolcats");
    let path = addressed_path(target, "https://img.example/1.png");

    assert_eq!(path.parent(), Some(target));
    assert!(path.extension().is_none());
}
