//! Integration tests for rr-cache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn rr_cache() -> Command {
        let mut cmd = cargo_bin_cmd!("rr-cache");
        cmd.env("CI", "1").env_remove("RR_CACHE_CONFIG");
        cmd
    }

    const NAMES: &str = r#"{"MNXM1":"H+","MNXM2":"H2O","MNXM3":"ATP"}"#;

    /// A cache root holding one valid local artifact, and a config pointing at it
    struct Sandbox {
        temp: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path().join("root");
            let artifacts = root.join("cache").join("mnx_4.4");
            std::fs::create_dir_all(&artifacts).unwrap();
            std::fs::write(artifacts.join("names.json"), NAMES).unwrap();

            let descriptor = serde_json::json!({
                "names": {
                    "deps": {"attr_deps": [], "file_deps": []},
                    "file": {
                        "url": "http://127.0.0.1:9/",
                        "name": "names.json",
                        "fingerprint": rr_cache::fingerprint::digest(NAMES.as_bytes()),
                    }
                }
            });
            let descriptor_path = temp.path().join("cache.json");
            std::fs::write(&descriptor_path, descriptor.to_string()).unwrap();

            let config = format!(
                "[cache]\ndir = {:?}\n\n[registry]\ndescriptor = {:?}\n\n[network]\ntimeout_secs = 5\n",
                root.display().to_string(),
                descriptor_path.display().to_string(),
            );
            std::fs::write(temp.path().join("config.toml"), config).unwrap();

            Self { temp }
        }

        fn config(&self) -> PathBuf {
            self.temp.path().join("config.toml")
        }

        fn artifact(&self) -> PathBuf {
            self.temp.path().join("root/cache/mnx_4.4/names.json")
        }

        fn cmd(&self) -> Command {
            let mut cmd = rr_cache();
            cmd.arg("-c").arg(self.config());
            cmd
        }
    }

    fn empty_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn help_displays() {
        rr_cache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Verified cache"));
    }

    #[test]
    fn version_displays() {
        rr_cache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("rr-cache"));
    }

    #[test]
    fn plan_orders_dependencies_first() {
        let temp = TempDir::new().unwrap();
        rr_cache()
            .arg("-c")
            .arg(empty_config(temp.path()))
            .args(["plan", "chebi_cid"])
            .assert()
            .success()
            .stdout("deprecatedCID_cid\ncid_xref\nchebi_cid\n");
    }

    #[test]
    fn plan_unknown_artifact_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        rr_cache()
            .arg("-c")
            .arg(empty_config(temp.path()))
            .args(["plan", "nonexistent"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown artifact: nonexistent"))
            .stderr(predicate::str::contains("rr-cache registry"));
    }

    #[test]
    fn plan_resolves_alias() {
        let temp = TempDir::new().unwrap();
        rr_cache()
            .arg("-c")
            .arg(empty_config(temp.path()))
            .args(["plan", "rr_full_reactions"])
            .assert()
            .success()
            .stdout(predicate::str::ends_with("template_reactions\n"));
    }

    #[test]
    fn registry_lists_artifacts() {
        let temp = TempDir::new().unwrap();
        rr_cache()
            .arg("-c")
            .arg(empty_config(temp.path()))
            .arg("registry")
            .assert()
            .success()
            .stdout(predicate::str::contains("template_reactions"))
            .stdout(predicate::str::contains("11 artifact(s)"));
    }

    #[test]
    fn config_path_follows_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        rr_cache()
            .arg("-c")
            .arg(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        rr_cache()
            .arg("-c")
            .arg(empty_config(temp.path()))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("mnx_version = \"4.4\""));
    }

    #[test]
    fn config_init_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        rr_cache()
            .arg("-c")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[network]"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nstrict_rebuild = \"maybe\"\n").unwrap();
        rr_cache()
            .arg("-c")
            .arg(&path)
            .arg("registry")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn get_reads_verified_local_copy() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["get", "names", "MNXM2", "--format", "plain"])
            .assert()
            .success()
            .stdout("H2O\n");
    }

    #[test]
    fn get_missing_entity_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["get", "names", "MNXM99"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("names has no entity MNXM99"));
    }

    #[test]
    fn get_unknown_kind_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["get", "cid_strc", "MNXM1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown artifact: cid_strc"));
    }

    #[test]
    fn list_respects_native_order_and_limit() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["list", "names", "--limit", "2"])
            .assert()
            .success()
            .stdout("MNXM1\nMNXM2\n");
    }

    #[test]
    fn load_reports_local_source() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["load", "names"])
            .assert()
            .success()
            .stdout(predicate::str::contains("names (local, verified)"));
    }

    #[test]
    fn verify_reports_status() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("verify")
            .assert()
            .success()
            .stdout(predicate::str::contains("valid"));

        std::fs::write(sandbox.artifact(), "{}").unwrap();
        sandbox
            .cmd()
            .arg("verify")
            .assert()
            .success()
            .stdout(predicate::str::contains("corrupt"));
    }

    #[test]
    fn corrupt_copy_without_fallback_is_unresolvable() {
        let sandbox = Sandbox::new();
        std::fs::write(sandbox.artifact(), r#"{"MNXM1":"tampered"}"#).unwrap();
        sandbox
            .cmd()
            .args(["get", "names", "MNXM1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unresolvable"));
    }

    #[test]
    fn registry_export_writes_current_fingerprints() {
        let sandbox = Sandbox::new();
        let out = sandbox.temp.path().join("export").join("cache.json");
        sandbox
            .cmd()
            .args(["registry", "--export"])
            .arg(&out)
            .assert()
            .success();

        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(
            exported["names"]["file"]["fingerprint"],
            rr_cache::fingerprint::digest(NAMES.as_bytes())
        );
    }

    #[test]
    fn registry_export_keeps_fingerprint_of_corrupt_copy() {
        let sandbox = Sandbox::new();
        std::fs::write(sandbox.artifact(), r#"{"tampered":1}"#).unwrap();
        let out = sandbox.temp.path().join("cache.export.json");
        sandbox
            .cmd()
            .args(["registry", "--export"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("names is corrupt"));

        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(
            exported["names"]["file"]["fingerprint"],
            rr_cache::fingerprint::digest(NAMES.as_bytes())
        );
        assert_ne!(
            exported["names"]["file"]["fingerprint"],
            rr_cache::fingerprint::digest(br#"{"tampered":1}"#)
        );
    }

    #[test]
    fn unreadable_cid_conversions_fail_before_loading() {
        let sandbox = Sandbox::new();
        let config = std::fs::read_to_string(sandbox.config()).unwrap().replace(
            "[network]",
            "cid_conversions = \"/nonexistent/convert.json\"\n\n[network]",
        );
        std::fs::write(sandbox.config(), config).unwrap();

        sandbox
            .cmd()
            .args(["load", "names"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("IO error: reading /nonexistent/convert.json"));
    }

    #[test]
    fn cache_dir_flag_overrides_config() {
        let sandbox = Sandbox::new();
        let elsewhere = TempDir::new().unwrap();
        sandbox
            .cmd()
            .arg("--cache-dir")
            .arg(elsewhere.path())
            .arg("verify")
            .assert()
            .success()
            .stdout(predicate::str::contains("missing"));
    }
}
