//! Fake libpq source and install trees.

use std::path::{Path, PathBuf};

use crate::util::process::ProcessBuilder;

/// Create `path` (and its parents) as an empty file.
pub fn touch(path: &Path) {
    write(path, "");
}

/// Create `path` (and its parents) with `contents`.
pub fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// The parts of an unpacked postgresql source tree the packager touches.
pub fn libpq_source_tree(root: &Path) {
    write(&root.join("COPYRIGHT"), "PostgreSQL Database Management System\n");
    write(&root.join("configure"), "#!/bin/sh\nexit 0\n");
    write(
        &root.join("src/include/postgres_ext.h"),
        "#ifndef POSTGRES_EXT_H\n#define POSTGRES_EXT_H\n#endif\n",
    );
    write(
        &root.join("src/include/pg_config_ext.h"),
        "#define PG_INT64_TYPE long int\n",
    );
    write(&root.join("src/common/Makefile"), "all:\n");
    write(&root.join("src/interfaces/libpq/Makefile"), "all:\n");

    let msvc = root.join("src/tools/msvc");
    write(
        &msvc.join("install.pl"),
        "use strict;\nuse warnings;\n\nuse Install qw(Install);\n",
    );
    write(&msvc.join("build.bat"), "@perl build.pl %*\n");
    write(&msvc.join("install.bat"), "@perl install.pl %*\n");
}

/// Files `make install` leaves in the output prefix of a staged build.
pub fn staged_install_hook(output_dir: &Path) -> impl Fn(&ProcessBuilder) + 'static {
    let output = output_dir.to_path_buf();
    move |_| {
        for file in [
            "lib/libpq.a",
            "lib/libpgcommon.a",
            "lib/libpq.so.5.10",
            "lib/pkgconfig/libpq.pc",
            "include/libpq-fe.h",
            "include/libpq-events.h",
            "include/libpq/libpq-fs.h",
        ] {
            touch(&output.join(file));
        }
    }
}

/// Files the MSVC install script leaves in the output prefix.
pub fn script_install_hook(output_dir: &Path) -> impl Fn(&ProcessBuilder) + 'static {
    let output = output_dir.to_path_buf();
    move |_| {
        for file in [
            "bin/libpq.dll",
            "lib/libpq.lib",
            "lib/libpgport.lib",
            "include/libpq-fe.h",
            "include/libpq/libpq-fs.h",
            "symbols/libpq.pdb",
        ] {
            touch(&output.join(file));
        }
    }
}

/// Every file below `root`, relative and sorted.
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}
