use anyhow::{Context, Result};
use colored::*;
use std::io::ErrorKind;
use std::path::Path;
use std::{env, fs, process};
use um_core::fixtures::{self, Fixture};
use um_core::image;

const MANIFESTO: &str = r#"
================================================================================
UM // LIVING SPECIFICATION
================================================================================

[ CONTRACT ]
Word:        32-bit unsigned, big-endian on disk.
Registers:   r0..r7, zero at start.
Segment 0:   the running program; replaced wholesale by loadp.
Faults:      bad opcode, bad segment, bad offset, div by zero, out > 255.
End of input reads as 0xFFFFFFFF.

================================================================================
UNIT TEST SUITE
================================================================================
"#;

const USAGE: &str = "\
USAGE:
    living-spec [NAME...]                 run fixtures (all when no names)
    living-spec --write <DIR> [NAME...]   write <name>.um/.0/.1 and manifest.json
";

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let code = match args.first().map(String::as_str) {
        Some("-h") | Some("--help") => {
            println!("{USAGE}");
            0
        }
        Some("--write") => match args.get(1) {
            Some(dir) => write_all(Path::new(dir), &args[2..]),
            None => {
                eprintln!("--write requires a directory\n\n{USAGE}");
                1
            }
        },
        _ => run_all(&args),
    };
    process::exit(code);
}

// --- TEST INFRASTRUCTURE ---

fn run_all(names: &[String]) -> i32 {
    println!("{}", MANIFESTO);
    let (selected, unknown) = select(names);
    let mut passed = 0;
    let mut failed = unknown.len();

    for fixture in selected {
        run_test(fixture.name, || fixture.check(), &mut passed, &mut failed);
    }

    println!("\n--------------------------------------------------------------------------------");
    if failed == 0 {
        println!("{}", format!("ALL SYSTEMS NOMINAL. ({passed} passed)").green().bold());
        0
    } else {
        println!("{}", format!("{failed} FAILED, {passed} passed.").red().bold());
        1
    }
}

fn run_test<F>(name: &str, test_fn: F, passed: &mut usize, failed: &mut usize)
where
    F: Fn() -> Result<(), String>,
{
    print!("TEST: {:<30} ... ", name);
    match test_fn() {
        Ok(_) => {
            println!("{}", "PASS".green());
            *passed += 1;
        }
        Err(e) => {
            println!("{}", "FAIL".red());
            println!("  -> {}", e);
            *failed += 1;
        }
    }
}

/// Resolves fixture names; no names means every fixture.
fn select(names: &[String]) -> (Vec<&'static Fixture>, Vec<String>) {
    if names.is_empty() {
        return (fixtures::all().iter().collect(), Vec::new());
    }
    let mut selected = Vec::new();
    let mut unknown = Vec::new();
    for name in names {
        match fixtures::find(name) {
            Some(fixture) => selected.push(fixture),
            None => {
                eprintln!("{}", format!("***** No test named {name} *****").red());
                unknown.push(name.clone());
            }
        }
    }
    (selected, unknown)
}

// --- FIXTURE WRITER ---

fn write_all(dir: &Path, names: &[String]) -> i32 {
    let (selected, unknown) = select(names);
    match write_fixtures(dir, &selected) {
        Ok(()) if unknown.is_empty() => 0,
        Ok(()) => 1,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            1
        }
    }
}

fn write_fixtures(dir: &Path, selected: &[&Fixture]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let mut manifest = Vec::with_capacity(selected.len());
    for fixture in selected {
        println!("***** Writing test '{}'.", fixture.name);
        write_fixture(dir, fixture)?;
        manifest.push(fixture.manifest());
    }

    let path = dir.join("manifest.json");
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&path, json).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

fn write_fixture(dir: &Path, fixture: &Fixture) -> Result<()> {
    image::write(dir.join(format!("{}.um", fixture.name)), &fixture.program())?;
    write_or_remove(&dir.join(format!("{}.0", fixture.name)), fixture.input)?;
    write_or_remove(&dir.join(format!("{}.1", fixture.name)), fixture.expect.output())?;
    Ok(())
}

/// Writes `contents` to `path`, or removes `path` when there is nothing to write.
fn write_or_remove(path: &Path, contents: &[u8]) -> Result<()> {
    if contents.is_empty() {
        match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("cannot remove {}", path.display()))
            }
            _ => Ok(()),
        }
    } else {
        fs::write(path, contents).with_context(|| format!("cannot write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn select_reports_unknown_names() {
        let (selected, unknown) = select(&["add".to_string(), "nope".to_string()]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "add");
        assert_eq!(unknown, vec!["nope".to_string()]);
    }

    #[test]
    fn select_defaults_to_everything() {
        let (selected, unknown) = select(&[]);
        assert_eq!(selected.len(), fixtures::all().len());
        assert!(unknown.is_empty());
    }

    #[test]
    fn writes_companion_files_and_manifest() {
        let dir = env::temp_dir().join(format!("living-spec-{}", process::id()));
        let input = fixtures::find("input").unwrap();
        let halt = fixtures::find("halt").unwrap();
        write_fixtures(&dir, &[input, halt]).unwrap();

        assert_eq!(fs::read(dir.join("input.um")).unwrap(), input.image());
        assert_eq!(fs::read(dir.join("input.0")).unwrap(), b"A");
        assert_eq!(fs::read(dir.join("input.1")).unwrap(), b"K");
        assert!(dir.join("halt.um").exists());
        assert!(!dir.join("halt.0").exists());
        assert!(!dir.join("halt.1").exists());

        let manifest: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest[0]["name"], "input");
        assert_eq!(manifest[0]["input"], "input.0");
        assert_eq!(manifest[1]["expected_output"], serde_json::Value::Null);

        fs::remove_dir_all(dir).ok();
    }
}
