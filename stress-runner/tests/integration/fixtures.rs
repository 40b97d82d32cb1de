// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use std::{os::unix::fs::PermissionsExt, sync::LazyLock};
use stress_runner::config::{Page, RewriteMode, RunConfiguration};

/// Stand-ins for the stress-testing tool. Each one ignores its arguments unless noted.
pub(crate) static FIXTURE_TOOLS: &[(&str, &str)] = &[
    ("pass-empty", "exit 0"),
    (
        "pass-responses",
        r#"
printf '{"message":"produced","value":{"request":"CursorInfo","offset":1}}\n'
printf '{"message":"produced","value":{"request":"CursorInfo","offset":2}}\n'
exit 0
"#,
    ),
    (
        "fail-single-error",
        r#"
printf '{"message":"detected","value":{"kind":"crashed","message":"errX"}}\n'
exit 1
"#,
    ),
    (
        "fail-after-responses",
        r#"
printf '{"message":"produced","value":"resp1"}\n'
printf '{"message":"produced","value":"resp2"}\n'
printf '{"message":"detected","value":{"kind":"failed","message":"err","offset":40}}\n'
exit 1
"#,
    ),
    // A successful exit takes precedence over a detected error.
    (
        "pass-with-detected",
        r#"
printf '{"message":"detected","value":{"kind":"crashed","message":"ignored"}}\n'
exit 0
"#,
    ),
    (
        "malformed",
        r#"
printf 'this is not a message\n'
exit 1
"#,
    ),
    (
        "two-errors",
        r#"
printf '{"message":"detected","value":{"kind":"crashed","message":"one"}}\n'
printf '{"message":"detected","value":{"kind":"crashed","message":"two"}}\n'
exit 0
"#,
    ),
    (
        "fail-without-error",
        r#"
printf '{"message":"produced","value":null}\n'
echo "something went wrong" >&2
exit 2
"#,
    ),
    // Reports each argument back as a response.
    (
        "echo-args",
        r#"
for arg in "$@"; do
    printf '{"message":"produced","value":"%s"}\n' "$arg"
done
exit 0
"#,
    ),
    // Appends to a counter file next to the script on every invocation.
    (
        "count-invocations",
        r#"
echo run >> "$(dirname "$0")/invocations"
exit 0
"#,
    ),
    // Reports a response, publishes its pid, then blocks in a grandchild process.
    (
        "hang",
        r#"
printf '{"message":"produced","value":"partial"}\n'
echo $$ > "$(dirname "$0")/hang.pid.tmp"
mv "$(dirname "$0")/hang.pid.tmp" "$(dirname "$0")/hang.pid"
sleep 60
exit 0
"#,
    ),
];

pub(crate) struct FixtureDir {
    // Held to keep the directory alive for the duration of the test binary.
    _dir: Utf8TempDir,
    root: Utf8PathBuf,
}

/// All fixture tools, written out once.
///
/// Writing every script up front, before any test spawns a process, avoids ETXTBSY errors from
/// executing a file that another thread's forked child still holds open for writing.
pub(crate) static FIXTURES: LazyLock<FixtureDir> =
    LazyLock::new(|| FixtureDir::new().expect("fixture tools written"));

impl FixtureDir {
    fn new() -> std::io::Result<Self> {
        let dir = camino_tempfile::Builder::new()
            .prefix("stress-runner-fixtures")
            .tempdir()?;
        let root = dir.path().to_owned();
        for (name, body) in FIXTURE_TOOLS {
            let tool_dir = root.join(name);
            std::fs::create_dir(&tool_dir)?;
            let path = tool_dir.join("stress-tool");
            std::fs::write(&path, format!("#!/bin/sh\n{body}"))?;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(Self { _dir: dir, root })
    }

    /// The directory holding the named tool.
    pub(crate) fn tool_dir(&self, name: &str) -> Utf8PathBuf {
        assert!(
            FIXTURE_TOOLS.iter().any(|(n, _)| *n == name),
            "unknown fixture tool {name}"
        );
        self.root.join(name)
    }

    /// A configuration that runs the named tool.
    pub(crate) fn config(&self, name: &str) -> RunConfiguration {
        config_for(&self.tool_dir(name).join("stress-tool"))
    }
}

pub(crate) fn config_for(executable: &Utf8Path) -> RunConfiguration {
    RunConfiguration::new(
        executable,
        "Sources/main.swift",
        RewriteMode::Basic,
        Page::new(1, 3).expect("valid page"),
        "swiftc",
    )
}
