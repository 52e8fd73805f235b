//! Fake ffmpeg/ffprobe executables for integration tests (unix shell).

#![allow(dead_code)] // not every test binary uses every fake tool

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// ffmpeg stand-in: appends its argv to `argv_log` and creates the output
/// file (the argument right before `-loglevel`).
pub fn fake_ffmpeg_ok(dir: &Path, argv_log: &Path) -> PathBuf {
    let body = format!(
        "#!/bin/sh\n\
         printf '%s\\n' \"$*\" >> \"{log}\"\n\
         prev=\"\"\n\
         out=\"\"\n\
         for a in \"$@\"; do\n\
         \tif [ \"$a\" = \"-loglevel\" ]; then out=\"$prev\"; fi\n\
         \tprev=\"$a\"\n\
         done\n\
         : > \"$out\"\n",
        log = argv_log.display()
    );
    write_script(dir, "ffmpeg-ok", &body)
}

/// ffmpeg stand-in: counts invocations in `count_log` and fails with an HTTP
/// 503 pattern on stderr every time.
pub fn fake_ffmpeg_http_503(dir: &Path, count_log: &Path) -> PathBuf {
    let body = format!(
        "#!/bin/sh\n\
         echo x >> \"{log}\"\n\
         echo \"HTTP error 503 Service Unavailable\" >&2\n\
         exit 1\n",
        log = count_log.display()
    );
    write_script(dir, "ffmpeg-503", &body)
}

/// ffmpeg stand-in: refuses to overwrite, exactly like `-n` against an
/// existing output.
pub fn fake_ffmpeg_already_exists(dir: &Path, count_log: &Path) -> PathBuf {
    let body = format!(
        "#!/bin/sh\n\
         echo x >> \"{log}\"\n\
         prev=\"\"\n\
         out=\"\"\n\
         for a in \"$@\"; do\n\
         \tif [ \"$a\" = \"-loglevel\" ]; then out=\"$prev\"; fi\n\
         \tprev=\"$a\"\n\
         done\n\
         echo \"File '$out' already exists. Exiting.\" >&2\n\
         exit 1\n",
        log = count_log.display()
    );
    write_script(dir, "ffmpeg-exists", &body)
}

/// ffmpeg stand-in: behaves like `fake_ffmpeg_ok` but sleeps on the very
/// first invocation, touching `started_marker` just before the sleep so a
/// test can interrupt the run while this invocation is in flight.
pub fn fake_ffmpeg_slow_first(dir: &Path, argv_log: &Path, started_marker: &Path) -> PathBuf {
    let body = format!(
        "#!/bin/sh\n\
         printf '%s\\n' \"$*\" >> \"{log}\"\n\
         if [ ! -e \"{marker}\" ]; then\n\
         \t: > \"{marker}\"\n\
         \tsleep 1\n\
         fi\n\
         prev=\"\"\n\
         out=\"\"\n\
         for a in \"$@\"; do\n\
         \tif [ \"$a\" = \"-loglevel\" ]; then out=\"$prev\"; fi\n\
         \tprev=\"$a\"\n\
         done\n\
         : > \"$out\"\n",
        log = argv_log.display(),
        marker = started_marker.display()
    );
    write_script(dir, "ffmpeg-slow-first", &body)
}

/// ffprobe stand-in reporting a fixed ten second duration.
pub fn fake_ffprobe_10s(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffprobe-10s",
        "#!/bin/sh\nprintf '{\"format\": {\"duration\": \"10.000000\"}}'\n",
    )
}
