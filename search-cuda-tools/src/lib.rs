use std::{
    env::{split_paths, var_os},
    fs,
    path::{Path, PathBuf},
    process::Command,
};

pub use find_cuda_helper::{find_cuda_root, include_cuda};

/// Returns the header path if `header` ships with the toolkit at `root`.
pub fn find_header(root: impl AsRef<Path>, header: &str) -> Option<PathBuf> {
    let path = root.as_ref().join("include").join(header);
    path.is_file().then_some(path)
}

/// Locates the directory holding `lib{name}.so`.
///
/// Returns `Some(None)` if the loader cache already knows the library,
/// `Some(Some(dir))` if it was found under the toolkit or the library search paths.
pub fn find_library(root: impl AsRef<Path>, name: &str) -> Option<Option<PathBuf>> {
    let file = format!("lib{name}.so");
    if cfg!(target_os = "linux") {
        if let Ok(output) = Command::new("ldconfig").arg("-p").output() {
            if String::from_utf8_lossy(&output.stdout).contains(&file) {
                return Some(None);
            }
        }
    }
    let root = root.as_ref();
    [root.join("lib64"), root.join("lib"), root.join("lib/x64")]
        .into_iter()
        .chain(
            ["LIBRARY_PATH", "LD_LIBRARY_PATH"]
                .into_iter()
                .filter_map(var_os)
                .flat_map(|paths| split_paths(&paths).collect::<Vec<_>>()),
        )
        .filter_map(|path| fs::read_dir(path).ok())
        .flatten()
        .filter_map(|result| result.ok())
        .find(|entry| entry.file_name() == file.as_str())?
        .path()
        .parent()
        .map(|dir| Some(dir.into()))
}

/// Emits the link directives for a toolkit library if it can be found.
pub fn link_library(root: impl AsRef<Path>, name: &str) -> bool {
    match find_library(root, name) {
        Some(dir) => {
            if let Some(dir) = dir {
                println!("cargo:rustc-link-search=native={}", dir.display());
            }
            println!("cargo:rustc-link-lib=dylib={name}");
            true
        }
        None => false,
    }
}

#[test]
fn test_find() {
    let Some(root) = find_cuda_root() else {
        println!("cuda not exist");
        return;
    };
    println!("cuda root = {}", root.display());
    println!("cuda.h = {:?}", find_header(&root, "cuda.h"));
    for name in ["cublas", "curand"] {
        match find_library(&root, name) {
            Some(Some(dir)) => println!("{name} in {}", dir.display()),
            Some(None) => println!("find {name} in ldconfig path"),
            None => println!("{name} not exist"),
        }
    }
}
