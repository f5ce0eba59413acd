use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use assert_cmd::prelude::*;
use rstest::rstest;

use sqlbench::config::context::build_context;

use crate::{test_store, TestStore};

mod basic;
mod one_off;

const TEST_CONFIG_FILE: &str = "sqlbench-test.toml";

fn write_config(store: &TestStore) -> std::io::Result<PathBuf> {
    let path = store.dir.path().join(TEST_CONFIG_FILE);
    let mut file = File::create(&path)?;
    write!(file, "{}", store.config_str())?;
    Ok(path)
}

fn sqlbench_cmd(store: &TestStore) -> Command {
    let config_path = write_config(store).unwrap();

    let mut cmd = Command::cargo_bin("sqlbench").expect("sqlbench bin exists");
    cmd.arg("-c")
        .arg(config_path)
        .current_dir(store.dir.path())
        .env("RUST_LOG", "sqlbench=warn");
    cmd
}
