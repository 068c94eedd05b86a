//! Shell scripts that behave like a compiler writing assembly.
//!
//! Scripts are run as `sh <script> <args...>`, so they need no execute bit.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use asmbench::config::CompilerConfig;

/// Writes a compiler script that emits `count` lines of assembly to the `-o`
/// path, chosen by the `-D<macro>=1` define and the `-O` level it receives.
///
/// Unknown combinations exit 1 with a message on stderr.
pub fn write_fake_compiler(
    dir: &Path,
    name: &str,
    counts: &[(&str, &str, u64)],
) -> io::Result<PathBuf> {
    let mut script = String::from(
        r#"out=""
define=""
level=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift ;;
    -D*=1) define="${1#-D}"; define="${define%=1}" ;;
    -O*) level="$1" ;;
  esac
  shift
done
case "$define $level" in
"#,
    );
    for (define, level, count) in counts {
        writeln!(script, "  \"{} {}\") n={} ;;", define, level, count).unwrap();
    }
    script.push_str(
        r#"  *) echo "no count for $define $level" >&2; exit 1 ;;
esac
: > "$out"
i=0
while [ "$i" -lt "$n" ]; do
  echo "	mov	%rdi, %rax" >> "$out"
  i=$((i + 1))
done
"#,
    );

    let path = dir.join(name);
    fs::write(&path, script)?;
    Ok(path)
}

/// Writes a compiler script that prints `message` to stderr and exits with
/// `code`.
pub fn write_failing_compiler(
    dir: &Path,
    name: &str,
    message: &str,
    code: i32,
) -> io::Result<PathBuf> {
    let script = format!(
        "echo '{}' >&2\nexit {}\n",
        message.replace('\'', r"'\''"),
        code
    );
    let path = dir.join(name);
    fs::write(&path, script)?;
    Ok(path)
}

/// Compiler entry running `script` through `sh`.
pub fn sh_compiler(label: &str, script: &Path) -> CompilerConfig {
    CompilerConfig::new(label, "sh").with_args([script.to_string_lossy().into_owned()])
}
