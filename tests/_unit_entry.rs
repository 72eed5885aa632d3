// SPDX-License-Identifier: AGPL-3.0-or-later

#![allow(clippy::all)]

mod unit_tests {
    use std::io::Write;

    use wot_engine::cfg::config::Config;

    /// `Config::load_from_file` must round-trip a realistic on-disk YAML
    /// file end to end: read it, parse its snake_case sections, apply
    /// per-field defaults for anything omitted, and pass validation.
    #[test]
    fn test_load_from_file_applies_defaults_and_validates() {
        let yaml = r#"
persistence:
  DataDir: "/var/lib/wot-node"
  CompactEveryNTxns: 1000
fetcher:
  MaxConcurrentFetches: 8
inserter: {}
puzzle:
  ClientPoolTarget: 20
"#;
        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        file.write_all(yaml.as_bytes()).expect("write fixture");

        let cfg = Config::load_from_file(file.path()).expect("config must load and validate");

        assert_eq!(cfg.persistence.data_dir, "/var/lib/wot-node");
        assert_eq!(cfg.persistence.compact_every_n_txns, 1000);
        assert_eq!(cfg.fetcher.max_concurrent_fetches, 8);
        assert_eq!(cfg.puzzle.client_pool_target, 20);
        // Fields left out of the fixture fall back to their serde defaults.
        assert_eq!(cfg.inserter.period, Config::default().inserter.period);
        assert_eq!(cfg.puzzle.max_puzzles_per_identity, Config::default().puzzle.max_puzzles_per_identity);
    }

    /// A config file that fails cross-field validation must be rejected by
    /// `load_from_file` itself, not left to the caller to re-check.
    #[test]
    fn test_load_from_file_rejects_invalid_backoff_ordering() {
        let yaml = r#"
persistence:
  DataDir: "/var/lib/wot-node"
fetcher:
  BaseBackoff: 100
  MaxBackoff: 10
inserter: {}
puzzle: {}
"#;
        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        file.write_all(yaml.as_bytes()).expect("write fixture");

        let err = Config::load_from_file(file.path()).expect_err("must reject base > max backoff");
        assert!(err.to_string().contains("BaseBackoff"));
    }
}
