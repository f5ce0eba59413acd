use crate::cli::*;

// Piped stdin only gets read to completion, so all the commands go in first
// and the output is checked afterwards.
#[rstest]
fn test_cli_basic(test_store: TestStore) -> std::io::Result<()> {
    let mut child = sqlbench_cmd(&test_store)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdin = child.stdin.take().expect("Failed to open stdin");

    // Nothing to run statements against yet
    writeln!(stdin, "SELECT 1;")?;
    writeln!(stdin, "\\create shop all the groceries")?;
    writeln!(
        stdin,
        "CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT);"
    )?;
    writeln!(stdin, "INSERT INTO items (name) VALUES ('apple');")?;
    writeln!(stdin, "SELECT name FROM items;")?;
    writeln!(stdin, "SELEKT oops;")?;
    writeln!(stdin, "\\d items")?;
    writeln!(stdin, "\\l")?;
    writeln!(stdin, "\\frobnicate")?;
    writeln!(stdin, "\\q")?;
    drop(stdin);

    let output = child.wait_with_output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stdout.contains("Created shop"));
    assert!(stdout.contains("apple"));
    assert!(stdout.contains("1 row ("));
    assert!(stdout.contains("INTEGER"));
    assert!(stdout.contains("all the groceries"));

    assert!(stderr.contains("No database selected"));
    assert!(stderr.contains("syntax error"));
    assert!(stderr.contains("'\\frobnicate' is not a valid command"));

    Ok(())
}
