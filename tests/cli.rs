use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use cbir::image::Image;
use cbir::utils;
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 三张纯色图片，A 与 B 接近，与 C 相差较远
#[fixture]
fn dataset() -> assert_fs::TempDir {
    let dir = assert_fs::TempDir::new().unwrap();
    for (name, value) in [("A.jpg", 10), ("B.jpg", 40), ("C.jpg", 200)] {
        let image = Image::filled(32, 32, [value, value, value]);
        utils::imwrite(dir.path().join(name), &image).unwrap();
    }
    // 不参与建库
    utils::imwrite(dir.path().join("D.png"), &Image::filled(32, 32, [10, 10, 10])).unwrap();
    dir
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout).lines().map(str::to_string).collect()
}

fn generate(conf_dir: &Path, dataset: &Path, args: &[&str]) -> Result<()> {
    let mut cmd = Command::cargo_bin("cbir")?;
    cmd.arg("-c").arg(conf_dir).arg("generate").arg(dataset).arg("--no-progress").args(args);
    cmd.assert().success();
    Ok(())
}

#[rstest]
fn baseline_excludes_query(dataset: assert_fs::TempDir) -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    generate(conf_dir.path(), dataset.path(), &[])?;

    let store = fs::read_to_string(conf_dir.path().join("baseline.csv"))?;
    assert_eq!(store.lines().count(), 3);
    assert!(store.lines().all(|line| line.split(',').count() == 148));

    let query = dataset.path().join("A.jpg");
    let assert = cargo_run!("cbir", "-c", conf_dir.path(), "identify", query, "-n", "2").success();
    let lines = stdout_lines(assert.get_output());
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("B.jpg"));
    assert!(lines[1].ends_with("C.jpg"));

    Ok(())
}

#[rstest]
#[case::histogram("histogram")]
#[case::multi_histogram("multi-histogram")]
#[case::texture_color("texture-color")]
fn strategies_rank_closest_first(
    dataset: assert_fs::TempDir,
    #[case] strategy: &str,
) -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let store = conf_dir.path().join("store.csv");
    let args = ["-s", strategy, "-b", "4", "-o", store.to_str().unwrap()];
    generate(conf_dir.path(), dataset.path(), &args)?;

    let assert = cargo_run!(
        "cbir", "identify", dataset.path().join("C.jpg"), "-s", strategy, "-b", "4", "-f", &store,
        "--output-format", "json"
    )
    .success();
    let result: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let result = result.as_array().unwrap();
    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|m| !m["identifier"].as_str().unwrap().ends_with("C.jpg")));

    Ok(())
}

#[rstest]
fn extract_prints_one_record(dataset: assert_fs::TempDir) -> Result<()> {
    let image = dataset.path().join("B.jpg");
    let assert = cargo_run!("cbir", "extract", &image).success();
    let lines = stdout_lines(assert.get_output());
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with(image.to_str().unwrap()));
    assert_eq!(lines[0].split(',').count(), 148);
    Ok(())
}

#[rstest]
fn deep_embedding_lookup() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let store = dir.path().join("embeddings.csv");
    fs::write(&store, "q.jpg,1,0,0\nnear.jpg,0.9,0.1,0\nfar.jpg,0,0,1\nmid.jpg,1,1,0\n")?;

    let query = dir.path().join("photos").join("q.jpg");
    let assert =
        cargo_run!("cbir", "identify", &query, "-s", "deep-embedding", "-f", &store, "-n", "2");
    let assert = assert.success();
    let lines = stdout_lines(assert.get_output());
    assert_eq!(lines.len(), 2);
    let near = dir.path().join("photos").join("near.jpg");
    assert!(lines[0].ends_with(near.to_str().unwrap()));
    assert!(lines[1].ends_with("mid.jpg"));

    let missing = dir.path().join("missing.jpg");
    cargo_run!("cbir", "identify", missing, "-s", "deep-embedding", "-f", &store)
        .failure()
        .stderr(predicate::str::contains("missing.jpg"));
    Ok(())
}

#[rstest]
fn missing_query_fails() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let store = dir.path().join("store.csv");
    fs::write(&store, "a.jpg,1\n")?;
    cargo_run!("cbir", "identify", dir.path().join("nope.jpg"), "-f", &store).failure();
    Ok(())
}

#[rstest]
fn deep_embedding_cannot_generate(dataset: assert_fs::TempDir) -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    cargo_run!("cbir", "-c", conf_dir.path(), "generate", dataset.path(), "-s", "deep-embedding")
        .failure();
    Ok(())
}
